//! 元素几何
//!
//! 内存中的文档没有排版，浮层定位需要的几何信息由 [`LayoutProbe`] 提供。
//! 嵌入方可以接入真实的排版结果，测试里用 [`StaticLayout`] 固定数值。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};

/// 视口坐标系中的矩形
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Rect {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self {
            top,
            bottom,
            left: 0.0,
            right: 0.0,
        }
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// 几何查询接口
pub trait LayoutProbe {
    /// 元素在视口中的外接矩形
    fn bounding_rect(&self, element: &Handle) -> Rect;
    /// 视口高度
    fn viewport_height(&self) -> f64;
    /// 浮层渲染后的高度
    fn measure_height(&self, overlay: &Handle) -> f64;
}

/// 没有排版信息：所有元素位于视口顶部，浮层高度为 0
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLayout;

impl LayoutProbe for NoLayout {
    fn bounding_rect(&self, _element: &Handle) -> Rect {
        Rect::default()
    }

    fn viewport_height(&self) -> f64 {
        768.0
    }

    fn measure_height(&self, _overlay: &Handle) -> f64 {
        0.0
    }
}

/// 固定几何：按元素登记矩形，浮层高度统一
#[derive(Debug)]
pub struct StaticLayout {
    viewport_height: f64,
    overlay_height: f64,
    rects: RefCell<HashMap<usize, (Weak<Node>, Rect)>>,
}

impl StaticLayout {
    pub fn new(viewport_height: f64, overlay_height: f64) -> Self {
        Self {
            viewport_height,
            overlay_height,
            rects: RefCell::new(HashMap::new()),
        }
    }

    pub fn set_rect(&self, element: &Handle, rect: Rect) {
        self.rects.borrow_mut().insert(
            Rc::as_ptr(element) as usize,
            (Rc::downgrade(element), rect),
        );
    }
}

impl LayoutProbe for StaticLayout {
    fn bounding_rect(&self, element: &Handle) -> Rect {
        self.rects
            .borrow()
            .get(&(Rc::as_ptr(element) as usize))
            .filter(|(node, _)| node.strong_count() > 0)
            .map(|(_, rect)| *rect)
            .unwrap_or_default()
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn measure_height(&self, _overlay: &Handle) -> f64 {
        self.overlay_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::create_element;

    #[test]
    fn test_static_layout_lookup() {
        let layout = StaticLayout::new(600.0, 80.0);
        let p = create_element("p", &[]);
        let other = create_element("p", &[]);
        layout.set_rect(&p, Rect::new(10.0, 40.0));

        assert_eq!(layout.bounding_rect(&p).top, 10.0);
        assert_eq!(layout.bounding_rect(&p).height(), 30.0);
        assert_eq!(layout.bounding_rect(&other), Rect::default());
        assert_eq!(layout.viewport_height(), 600.0);
        assert_eq!(layout.measure_height(&p), 80.0);
    }
}
