//! In-memory animation target used across this crate's tests.

use chainable_core::{AnimatedTarget, Axis, Margins, ViewProperty};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A stand-in view: every property starts at 0.0, dimensions at 0.0, and
/// layout requests are counted. Margin adjustment is only reported on
/// instances built with [`StubView::with_margins`].
pub(crate) struct StubView {
    properties: Mutex<HashMap<ViewProperty, f32>>,
    width: Mutex<f32>,
    height: Mutex<f32>,
    margins: Mutex<Margins>,
    margin_capable: bool,
    layout_requests: AtomicUsize,
}

impl StubView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            properties: Mutex::new(HashMap::new()),
            width: Mutex::new(0.0),
            height: Mutex::new(0.0),
            margins: Mutex::new(Margins::default()),
            margin_capable: false,
            layout_requests: AtomicUsize::new(0),
        })
    }

    pub fn with_margins(margins: Margins) -> Arc<Self> {
        Arc::new(Self {
            properties: Mutex::new(HashMap::new()),
            width: Mutex::new(0.0),
            height: Mutex::new(0.0),
            margins: Mutex::new(margins),
            margin_capable: true,
            layout_requests: AtomicUsize::new(0),
        })
    }

    pub fn value(&self, property: ViewProperty) -> f32 {
        self.get(property)
    }

    pub fn current_margins(&self) -> Margins {
        *self.margins.lock().unwrap()
    }

    pub fn layout_requests(&self) -> usize {
        self.layout_requests.load(Ordering::SeqCst)
    }
}

impl AnimatedTarget for StubView {
    fn get(&self, property: ViewProperty) -> f32 {
        self.properties
            .lock()
            .unwrap()
            .get(&property)
            .copied()
            .unwrap_or(0.0)
    }

    fn set(&self, property: ViewProperty, value: f32) {
        self.properties.lock().unwrap().insert(property, value);
    }

    fn dimension(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => *self.width.lock().unwrap(),
            Axis::Vertical => *self.height.lock().unwrap(),
        }
    }

    fn set_dimension(&self, axis: Axis, value: f32) {
        match axis {
            Axis::Horizontal => *self.width.lock().unwrap() = value,
            Axis::Vertical => *self.height.lock().unwrap() = value,
        }
    }

    fn request_layout(&self) {
        self.layout_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn supports_margin_adjustment(&self) -> bool {
        self.margin_capable
    }

    fn margins(&self) -> Margins {
        *self.margins.lock().unwrap()
    }

    fn set_margins(&self, margins: Margins) {
        *self.margins.lock().unwrap() = margins;
    }
}
