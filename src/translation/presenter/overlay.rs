//! 原文浮层
//!
//! 译文宿主在悬停时显示原文浮层，浮层可以固定。所有监听器都挂在宿主的
//! [`ListenerLease`] 上，撤销租约即可一次性解除，不会留下悬空的监听器。
//!
//! 浏览器事件在这里表现为 [`OverlayPresenter::dispatch_pointer`] 调用，
//! 延迟移除通过共享的 [`TimerQueue`] 完成。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use markup5ever_rcdom::Handle;
use tokio_util::sync::CancellationToken;

use super::lease::ListenerLease;
use super::styles;
use super::timers::{TimerId, TimerQueue, TimerTask};
use crate::parsers::html::document::{same_node, Document};
use crate::parsers::html::dom::{
    self, add_class, append_child, create_element, create_text, get_node_attr, has_class,
    has_node_attr, is_text, remove_class,
};
use crate::parsers::html::layout::{LayoutProbe, Rect};
use crate::translation::config::constants;
use crate::translation::pipeline::target::{Target, TargetKey, TargetKind};
use crate::translation::storage::state::TranslationStateStore;

const PIN_ICON_PATH: &str = "M16,12V4H17V2H7V4H8V12L6,14V16H11.2V22H12.8V16H18V14L16,12M8.8,14L10,12.8V4H14V12.8L15.2,14H8.8Z";

/// 指针事件
#[derive(Debug, Clone)]
pub enum PointerEvent {
    /// 指针进入元素；`related` 是指针离开的元素
    Enter { related: Option<Handle> },
    /// 指针离开元素；`related` 是指针进入的元素
    Leave { related: Option<Handle> },
    Click,
}

/// 浮层显示在宿主上方还是下方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPosition {
    Top,
    Bottom,
}

impl OverlayPosition {
    pub fn class_name(&self) -> &'static str {
        match self {
            OverlayPosition::Top => constants::CLASS_POSITION_TOP,
            OverlayPosition::Bottom => constants::CLASS_POSITION_BOTTOM,
        }
    }
}

/// 定位结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: OverlayPosition,
    /// 空间不足时限制的最大高度（像素）
    pub max_height: Option<f64>,
}

/// 默认显示在上方；上方放不下且下方空间更大时改到下方
pub fn place_overlay(rect: Rect, viewport_height: f64, overlay_height: f64) -> Placement {
    let space_above = rect.top;
    let space_below = viewport_height - rect.bottom;
    let required_above = overlay_height + constants::OVERLAY_MARGIN;

    if space_above < required_above && space_below > space_above {
        let max_height = (space_below < overlay_height + constants::OVERLAY_EDGE_PADDING).then(|| {
            (space_below - constants::OVERLAY_EDGE_PADDING).max(constants::OVERLAY_MIN_HEIGHT)
        });
        Placement {
            position: OverlayPosition::Bottom,
            max_height,
        }
    } else {
        let max_height = (space_above < required_above + constants::OVERLAY_EDGE_PADDING)
            .then(|| {
                (space_above - constants::OVERLAY_EDGE_PADDING - constants::OVERLAY_MARGIN)
                    .max(constants::OVERLAY_MIN_HEIGHT)
            });
        Placement {
            position: OverlayPosition::Top,
            max_height,
        }
    }
}

/// 已插入页面的浮层
#[derive(Debug)]
struct OverlayBinding {
    overlay: Handle,
    host: Handle,
    /// 宿主租约的子令牌
    token: CancellationToken,
    pending_removal: Option<TimerId>,
}

impl OverlayBinding {
    fn is_pinned(&self) -> bool {
        has_class(&self.overlay, constants::CLASS_PINNED)
    }
}

/// 原文浮层管理
pub struct OverlayPresenter {
    document: Rc<Document>,
    store: Rc<TranslationStateStore>,
    timers: Rc<TimerQueue>,
    layout: Rc<dyn LayoutProbe>,
    attribute_names: Vec<String>,
    show_original: Cell<bool>,
    leases: RefCell<Vec<ListenerLease>>,
    overlays: RefCell<Vec<OverlayBinding>>,
}

impl std::fmt::Debug for OverlayPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayPresenter")
            .field("show_original", &self.show_original.get())
            .field("leases", &self.leases.borrow().len())
            .field("overlays", &self.overlays.borrow().len())
            .finish()
    }
}

impl OverlayPresenter {
    pub fn new(
        document: Rc<Document>,
        store: Rc<TranslationStateStore>,
        timers: Rc<TimerQueue>,
        layout: Rc<dyn LayoutProbe>,
        attribute_names: Vec<String>,
    ) -> Self {
        Self {
            document,
            store,
            timers,
            layout,
            attribute_names,
            show_original: Cell::new(true),
            leases: RefCell::new(Vec::new()),
            overlays: RefCell::new(Vec::new()),
        }
    }

    pub fn show_original(&self) -> bool {
        self.show_original.get()
    }

    pub fn set_show_original(&self, show_original: bool) {
        self.show_original.set(show_original);
    }

    // ------------------------------------------------------------------
    // 挂载与解除
    // ------------------------------------------------------------------

    /// 为已翻译的目标挂载悬停行为
    ///
    /// 关闭"显示原文"时不做任何事。同一宿主只绑定一次，重复调用返回已有租约。
    pub fn attach(&self, target: &Target, original: &str) -> Option<ListenerLease> {
        if !self.show_original.get() {
            return None;
        }
        styles::inject_tooltip_styles(&self.document);

        let host = &target.host;
        match &target.kind {
            TargetKind::Attribute { name, .. } => {
                let marker = format!("{}{}", constants::ATTR_ORIGINAL_PREFIX, name);
                if marker != constants::ATTR_ORIGINAL_TITLE {
                    self.preserve_title(host);
                }
                self.document.set_attribute(host, &marker, original);
            }
            TargetKind::Text { .. } => self.preserve_title(host),
        }
        self.document
            .set_attribute(host, constants::ATTR_TRANSLATED, "true");

        self.prune_dead_leases();
        if has_node_attr(host, constants::ATTR_HANDLER_ADDED) {
            if let Some(lease) = self.lease_for(host) {
                return Some(lease);
            }
        }

        self.document
            .set_attribute(host, constants::ATTR_HANDLER_ADDED, "true");
        let lease = ListenerLease::new(host);
        self.leases.borrow_mut().push(lease.clone());
        Some(lease)
    }

    fn preserve_title(&self, host: &Handle) {
        if has_node_attr(host, constants::ATTR_ORIGINAL_TITLE) {
            return;
        }
        if let Some(title) = get_node_attr(host, "title") {
            self.document
                .set_attribute(host, constants::ATTR_ORIGINAL_TITLE, &title);
        }
    }

    fn prune_dead_leases(&self) {
        self.leases.borrow_mut().retain(|lease| lease.host().is_some());
    }

    /// 宿主上仍然有效的租约
    pub fn lease_for(&self, host: &Handle) -> Option<ListenerLease> {
        self.leases
            .borrow()
            .iter()
            .find(|lease| lease.is_host(host) && lease.is_active())
            .cloned()
    }

    pub fn active_lease_count(&self) -> usize {
        self.leases
            .borrow()
            .iter()
            .filter(|lease| lease.is_active())
            .count()
    }

    /// 撤销一个宿主的租约并移除它的浮层
    pub fn detach(&self, host: &Handle) {
        let bindings: Vec<OverlayBinding> = {
            let mut overlays = self.overlays.borrow_mut();
            let (matching, rest) = overlays
                .drain(..)
                .partition(|binding| same_node(&binding.host, host));
            *overlays = rest;
            matching
        };
        for binding in bindings {
            self.discard_binding(binding);
        }

        for overlay in self.overlay_children(host) {
            self.document.remove(&overlay);
        }

        self.leases.borrow_mut().retain(|lease| {
            if lease.is_host(host) {
                lease.revoke();
                false
            } else {
                true
            }
        });
        self.document
            .remove_attribute(host, constants::ATTR_HANDLER_ADDED);
    }

    /// 移除页面上所有浮层并撤销全部租约
    pub fn detach_all(&self) {
        let bindings: Vec<OverlayBinding> = self.overlays.borrow_mut().drain(..).collect();
        for binding in bindings {
            self.discard_binding(binding);
        }

        let root = self.document.root().clone();
        for overlay in self
            .document
            .elements_with_class(&root, constants::CLASS_ORIGINAL_DISPLAY)
        {
            self.document.remove(&overlay);
        }

        let leases: Vec<ListenerLease> = self.leases.borrow_mut().drain(..).collect();
        for lease in &leases {
            lease.revoke();
            if let Some(host) = lease.host() {
                self.document
                    .remove_attribute(&host, constants::ATTR_HANDLER_ADDED);
            }
        }
        for host in self
            .document
            .elements_with_attr(&root, constants::ATTR_HANDLER_ADDED)
        {
            self.document
                .remove_attribute(&host, constants::ATTR_HANDLER_ADDED);
        }
        if !leases.is_empty() {
            tracing::debug!("已撤销 {} 个宿主的监听器", leases.len());
        }
    }

    fn discard_binding(&self, binding: OverlayBinding) {
        if let Some(id) = binding.pending_removal {
            self.timers.cancel(id);
        }
        binding.token.cancel();
        if self.document.is_connected(&binding.overlay) {
            self.document.remove(&binding.overlay);
        }
    }

    // ------------------------------------------------------------------
    // 指针事件
    // ------------------------------------------------------------------

    /// 投递指针事件；返回事件是否被浮层逻辑处理
    pub fn dispatch_pointer(&self, target: &Handle, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Click => self.handle_click(target),
            PointerEvent::Enter { .. } if has_class(target, constants::CLASS_ORIGINAL_DISPLAY) => {
                self.handle_overlay_enter(target)
            }
            PointerEvent::Leave { related } if has_class(target, constants::CLASS_ORIGINAL_DISPLAY) => {
                self.handle_overlay_leave(target, related.as_ref())
            }
            PointerEvent::Enter { .. } => match self.lease_for(target) {
                Some(_) => {
                    self.handle_host_enter(target);
                    true
                }
                None => false,
            },
            PointerEvent::Leave { related } => match self.lease_for(target) {
                Some(_) => {
                    self.handle_host_leave(target, related.as_ref());
                    true
                }
                None => false,
            },
        }
    }

    fn handle_host_enter(&self, host: &Handle) {
        // 指针回到宿主，取消待执行的移除
        self.cancel_pending_for_host(host);

        if !self.overlay_children(host).is_empty() {
            return;
        }

        let Some(content) = self.originals_for(host) else {
            return;
        };
        let Some(lease) = self.lease_for(host) else {
            return;
        };

        let overlay = build_overlay(&content);
        let placement = place_overlay(
            self.layout.bounding_rect(host),
            self.layout.viewport_height(),
            self.layout.measure_height(&overlay),
        );
        add_class(&overlay, placement.position.class_name());
        if let Some(max_height) = placement.max_height {
            dom::set_node_attr(
                &overlay,
                "style",
                Some(format!("max-height: {}px; overflow-y: auto", max_height)),
            );
        }

        self.document.prepend_child(host, &overlay);
        self.overlays.borrow_mut().push(OverlayBinding {
            overlay,
            host: host.clone(),
            token: lease.child_token(),
            pending_removal: None,
        });
    }

    fn handle_host_leave(&self, host: &Handle, related: Option<&Handle>) {
        let Some(overlay) = self
            .overlay_children(host)
            .into_iter()
            .find(|overlay| !has_class(overlay, constants::CLASS_PINNED))
        else {
            return;
        };
        if let Some(related) = related {
            if dom::contains(&overlay, related) || dom::contains(host, related) {
                return;
            }
        }
        self.schedule_removal(&overlay, constants::HOST_LEAVE_DELAY);
    }

    fn handle_overlay_enter(&self, overlay: &Handle) -> bool {
        let mut overlays = self.overlays.borrow_mut();
        let Some(binding) = overlays
            .iter_mut()
            .find(|binding| same_node(&binding.overlay, overlay) && !binding.token.is_cancelled())
        else {
            return false;
        };
        if let Some(id) = binding.pending_removal.take() {
            self.timers.cancel(id);
        }
        true
    }

    fn handle_overlay_leave(&self, overlay: &Handle, related: Option<&Handle>) -> bool {
        let pinned = match self.live_binding(overlay) {
            Some(pinned) => pinned,
            None => return false,
        };
        if pinned {
            return true;
        }
        if let Some(related) = related {
            if dom::contains(overlay, related) {
                return true;
            }
        }
        self.schedule_removal(overlay, constants::OVERLAY_LEAVE_DELAY);
        true
    }

    fn handle_click(&self, target: &Handle) -> bool {
        let Some(icon) = dom::closest(target, |element| has_class(element, constants::CLASS_PIN_ICON))
        else {
            return false;
        };
        let Some(overlay) = dom::closest(&icon, |element| {
            has_class(element, constants::CLASS_ORIGINAL_DISPLAY)
        }) else {
            return false;
        };
        let Some(pinned) = self.live_binding(&overlay) else {
            return false;
        };

        if pinned {
            remove_class(&overlay, constants::CLASS_PINNED);
            self.remove_overlay(&overlay);
        } else {
            add_class(&overlay, constants::CLASS_PINNED);
            let mut overlays = self.overlays.borrow_mut();
            if let Some(binding) = overlays
                .iter_mut()
                .find(|binding| same_node(&binding.overlay, &overlay))
            {
                if let Some(id) = binding.pending_removal.take() {
                    self.timers.cancel(id);
                }
            }
        }
        true
    }

    /// 浮层的监听器仍然有效时返回其固定状态
    fn live_binding(&self, overlay: &Handle) -> Option<bool> {
        self.overlays
            .borrow()
            .iter()
            .find(|binding| same_node(&binding.overlay, overlay) && !binding.token.is_cancelled())
            .map(OverlayBinding::is_pinned)
    }

    fn cancel_pending_for_host(&self, host: &Handle) {
        for binding in self
            .overlays
            .borrow_mut()
            .iter_mut()
            .filter(|binding| same_node(&binding.host, host))
        {
            if let Some(id) = binding.pending_removal.take() {
                self.timers.cancel(id);
            }
        }
    }

    fn schedule_removal(&self, overlay: &Handle, delay: std::time::Duration) {
        let mut overlays = self.overlays.borrow_mut();
        let Some(binding) = overlays
            .iter_mut()
            .find(|binding| same_node(&binding.overlay, overlay))
        else {
            return;
        };
        if let Some(id) = binding.pending_removal.take() {
            self.timers.cancel(id);
        }
        let id = self.timers.schedule(
            delay,
            TimerTask::RemoveOverlay {
                overlay: overlay.clone(),
            },
        );
        binding.pending_removal = Some(id);
    }

    /// 延迟移除到期：已固定或已撤销的浮层保持不动
    pub fn fire_removal(&self, overlay: &Handle) {
        match self.live_binding(overlay) {
            Some(false) => self.remove_overlay(overlay),
            Some(true) => {
                if let Some(binding) = self
                    .overlays
                    .borrow_mut()
                    .iter_mut()
                    .find(|binding| same_node(&binding.overlay, overlay))
                {
                    binding.pending_removal = None;
                }
            }
            None => {}
        }
    }

    fn remove_overlay(&self, overlay: &Handle) {
        let binding = {
            let mut overlays = self.overlays.borrow_mut();
            overlays
                .iter()
                .position(|binding| same_node(&binding.overlay, overlay))
                .map(|index| overlays.remove(index))
        };
        match binding {
            Some(binding) => self.discard_binding(binding),
            None => self.document.remove(overlay),
        }
    }

    // ------------------------------------------------------------------
    // 查询
    // ------------------------------------------------------------------

    /// 宿主直接子节点中的浮层
    pub fn overlay_children(&self, host: &Handle) -> Vec<Handle> {
        host.children
            .borrow()
            .iter()
            .filter(|child| has_class(child, constants::CLASS_ORIGINAL_DISPLAY))
            .cloned()
            .collect()
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.borrow().len()
    }

    /// 浮层内容：宿主内已翻译文本的原文用空格连接，
    /// 再与已翻译属性的原文一起用 ` / ` 连接
    fn originals_for(&self, host: &Handle) -> Option<String> {
        let identity = self.store.identity();

        let texts: Vec<String> = dom::descendants(host)
            .iter()
            .filter(|node| is_text(node))
            .filter_map(|node| identity.peek(node))
            .filter_map(|id| self.store.get(&TargetKey::text(&id)))
            .filter(|entry| entry.is_translated())
            .map(|entry| entry.original)
            .collect();

        let mut parts = Vec::new();
        if !texts.is_empty() {
            parts.push(texts.join(" "));
        }
        if let Some(host_id) = identity.peek(host) {
            parts.extend(
                self.attribute_names
                    .iter()
                    .filter_map(|name| self.store.get(&TargetKey::attribute(name, &host_id)))
                    .filter(|entry| entry.is_translated())
                    .map(|entry| entry.original),
            );
        }

        (!parts.is_empty()).then(|| parts.join(" / "))
    }
}

/// 构建浮层：标题行（"Original:" + 固定按钮）和原文
fn build_overlay(content: &str) -> Handle {
    let overlay = create_element("div", &[("class", constants::CLASS_ORIGINAL_DISPLAY)]);

    let header = create_element("div", &[("class", constants::CLASS_ORIGINAL_HEADER)]);
    append_child(&header, &create_text("Original:"));
    let pin_icon = create_element("div", &[("class", constants::CLASS_PIN_ICON)]);
    let svg = create_element(
        "svg",
        &[("viewBox", "0 0 24 24"), ("xmlns", "http://www.w3.org/2000/svg")],
    );
    append_child(&svg, &create_element("path", &[("d", PIN_ICON_PATH)]));
    append_child(&pin_icon, &svg);
    append_child(&header, &pin_icon);

    let body = create_element("div", &[("class", constants::CLASS_ORIGINAL_CONTENT)]);
    append_child(&body, &create_text(content));

    append_child(&overlay, &header);
    append_child(&overlay, &body);
    overlay
}
