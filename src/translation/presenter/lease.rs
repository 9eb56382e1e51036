//! 监听器租约
//!
//! 每个宿主元素一个取消令牌；浮层上的监听器绑定在它的子令牌上，
//! 取消宿主令牌即一次性撤销该宿主的全部监听器。

use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};
use tokio_util::sync::CancellationToken;

/// 宿主的监听器租约
#[derive(Debug, Clone)]
pub struct ListenerLease {
    host: Weak<Node>,
    token: CancellationToken,
}

impl ListenerLease {
    pub fn new(host: &Handle) -> Self {
        Self {
            host: Rc::downgrade(host),
            token: CancellationToken::new(),
        }
    }

    /// 宿主仍然存活时返回
    pub fn host(&self) -> Option<Handle> {
        self.host.upgrade()
    }

    pub fn is_host(&self, node: &Handle) -> bool {
        std::ptr::eq(self.host.as_ptr(), Rc::as_ptr(node))
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && self.host.strong_count() > 0
    }

    /// 浮层监听器使用的子令牌
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn revoke(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::create_element;

    #[test]
    fn test_revoke_cancels_children() {
        let host = create_element("p", &[]);
        let lease = ListenerLease::new(&host);
        let child = lease.child_token();
        assert!(lease.is_active());
        assert!(lease.is_host(&host));

        lease.revoke();
        assert!(!lease.is_active());
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_lease_does_not_keep_host_alive() {
        let host = create_element("p", &[]);
        let lease = ListenerLease::new(&host);
        drop(host);
        assert!(lease.host().is_none());
        assert!(!lease.is_active());
    }
}
