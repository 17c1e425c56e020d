//! Selection shapes and hit-testing.
//!
//! A selection is either absent (operations apply to the whole active
//! layer) or one shape plus its tight axis-aligned bounding box. New
//! marquee/lasso results REPLACE the prior selection; additive/subtractive
//! combination via modifier keys is an extension point that is deliberately
//! not implemented here.

/// Axis-aligned bounds in document coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// The tight box around a point list; `None` when empty.
    pub fn of_points(points: &[(f32, f32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (mut min_x, mut min_y) = *first;
        let (mut max_x, mut max_y) = *first;
        for &(x, y) in rest {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// The shape of an active selection.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionShape {
    Rectangle(Bounds),
    Ellipse(Bounds),
    /// Freeform lasso path, implicitly closed.
    Polygon(Vec<(f32, f32)>),
}

/// Current selection state. `Selection::default()` is "nothing selected",
/// which every masked operation treats as "everything selected".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    shape: Option<SelectionShape>,
}

impl Selection {
    pub fn is_active(&self) -> bool {
        self.shape.is_some()
    }

    pub fn shape(&self) -> Option<&SelectionShape> {
        self.shape.as_ref()
    }

    /// Replace the selection with a rectangle.
    pub fn set_rectangle(&mut self, bounds: Bounds) {
        self.shape = Some(SelectionShape::Rectangle(bounds));
    }

    /// Replace the selection with an ellipse inscribed in `bounds`.
    pub fn set_ellipse(&mut self, bounds: Bounds) {
        self.shape = Some(SelectionShape::Ellipse(bounds));
    }

    /// Replace the selection with a freeform polygon. Degenerate paths
    /// (fewer than 3 points) clear the selection instead.
    pub fn set_polygon(&mut self, points: Vec<(f32, f32)>) {
        if points.len() < 3 {
            self.shape = None;
        } else {
            self.shape = Some(SelectionShape::Polygon(points));
        }
    }

    /// Select the full canvas.
    pub fn select_all(&mut self, width: u32, height: u32) {
        self.set_rectangle(Bounds::new(0.0, 0.0, width as f32, height as f32));
    }

    pub fn clear(&mut self) {
        self.shape = None;
    }

    /// Tight bounding box of the current shape.
    pub fn bounds(&self) -> Option<Bounds> {
        match &self.shape {
            None => None,
            Some(SelectionShape::Rectangle(b)) | Some(SelectionShape::Ellipse(b)) => Some(*b),
            Some(SelectionShape::Polygon(points)) => Bounds::of_points(points),
        }
    }

    /// Whether a document-space point falls inside the selection. With no
    /// selection, every point is "inside".
    pub fn contains(&self, x: f32, y: f32) -> bool {
        match &self.shape {
            None => true,
            Some(SelectionShape::Rectangle(b)) => b.contains(x, y),
            Some(SelectionShape::Ellipse(b)) => {
                let rx = b.width / 2.0;
                let ry = b.height / 2.0;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (x - (b.x + rx)) / rx;
                let dy = (y - (b.y + ry)) / ry;
                dx * dx + dy * dy <= 1.0
            }
            Some(SelectionShape::Polygon(points)) => point_in_polygon(x, y, points),
        }
    }
}

/// Even-odd rule ray cast along +x.
pub fn point_in_polygon(x: f32, y: f32, points: &[(f32, f32)]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}
