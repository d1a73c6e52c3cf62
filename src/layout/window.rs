use std::ops::Range;

/// Cumulative vertical extents of the fixture rows, precomputed once per
/// layout pass. All values are content-space pixels (scroll offset not
/// applied).
#[derive(Debug, Clone, Default)]
pub struct RowOffsets {
    spans: Vec<(f64, f64)>,
    total: f64,
}

impl RowOffsets {
    pub fn from_heights<I: IntoIterator<Item = f64>>(heights: I) -> Self {
        let mut spans = Vec::new();
        let mut top = 0.0;
        for height in heights {
            spans.push((top, top + height));
            top += height;
        }
        Self { spans, total: top }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Total scroll-content height.
    pub fn total_height(&self) -> f64 {
        self.total
    }

    /// `(top, bottom)` of the given row.
    pub fn span(&self, index: usize) -> Option<(f64, f64)> {
        self.spans.get(index).copied()
    }

    /// The half-open `[start, end)` range of row indices that must be
    /// rendered for the given scroll position, expanded by `overscan` rows
    /// on each side.
    ///
    /// A `None` viewport height means the container has not been measured
    /// yet; rendering nothing is cheaper than rendering everything.
    pub fn visible_range(
        &self,
        scroll_top: f64,
        viewport_height: Option<f64>,
        overscan: usize,
    ) -> Range<usize> {
        let Some(viewport_height) = viewport_height else {
            return 0..0;
        };
        if self.spans.is_empty() || viewport_height <= 0.0 {
            return 0..0;
        }

        let start = self
            .spans
            .iter()
            .position(|&(_, bottom)| bottom > scroll_top)
            .unwrap_or(self.spans.len());
        let cutoff = scroll_top + viewport_height;
        let end = self
            .spans
            .iter()
            .skip(start)
            .position(|&(top, _)| top >= cutoff)
            .map_or(self.spans.len(), |i| start + i);

        let start = start.saturating_sub(overscan);
        let end = (end + overscan).min(self.spans.len());
        start..end
    }

    /// The row containing content-space `y`. Clamps to the nearest boundary
    /// row when outside the content, so pointer operations always resolve to
    /// a row while dragging. `None` only when there are no rows at all.
    pub fn row_at_y(&self, y: f64) -> Option<usize> {
        if self.spans.is_empty() {
            return None;
        }
        if y < 0.0 {
            return Some(0);
        }
        if y >= self.total {
            return Some(self.spans.len() - 1);
        }
        self.spans
            .iter()
            .position(|&(top, bottom)| y >= top && y < bottom)
            // Unreachable given the bounds checks above, but clamping beats panicking.
            .or(Some(self.spans.len() - 1))
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn offsets() -> RowOffsets {
        // Five rows of 40px: content height 200.
        RowOffsets::from_heights([40.0, 40.0, 40.0, 40.0, 40.0])
    }

    #[test]
    fn cumulative_spans() {
        let rows = offsets();
        assert_eq!(rows.total_height(), 200.0);
        assert_eq!(rows.span(0), Some((0.0, 40.0)));
        assert_eq!(rows.span(4), Some((160.0, 200.0)));
        assert_eq!(rows.span(5), None);
    }

    #[test]
    fn window_without_overscan() {
        let rows = offsets();
        // Viewport [40, 120): rows 1 and 2.
        assert_eq!(rows.visible_range(40.0, Some(80.0), 0), 1..3);
        // Partially visible rows count.
        assert_eq!(rows.visible_range(30.0, Some(80.0), 0), 0..3);
    }

    #[test]
    fn overscan_expands_and_clamps() {
        let rows = offsets();
        assert_eq!(rows.visible_range(40.0, Some(80.0), 5), 0..5);
        assert_eq!(rows.visible_range(0.0, Some(40.0), 1), 0..2);
    }

    #[test]
    fn unmeasured_viewport_renders_nothing() {
        let rows = offsets();
        assert_eq!(rows.visible_range(0.0, None, 5), 0..0);
    }

    #[test]
    fn no_rows_renders_nothing() {
        let rows = RowOffsets::from_heights([]);
        assert_eq!(rows.visible_range(0.0, Some(500.0), 5), 0..0);
        assert_eq!(rows.row_at_y(10.0), None);
    }

    #[test]
    fn scrolled_past_end_is_empty_without_overscan() {
        let rows = offsets();
        assert_eq!(rows.visible_range(1000.0, Some(80.0), 0), 5..5);
    }

    #[test]
    fn row_at_y_clamps_to_boundary_rows() {
        let rows = offsets();
        assert_eq!(rows.row_at_y(-50.0), Some(0));
        assert_eq!(rows.row_at_y(0.0), Some(0));
        assert_eq!(rows.row_at_y(39.9), Some(0));
        assert_eq!(rows.row_at_y(40.0), Some(1));
        assert_eq!(rows.row_at_y(199.9), Some(4));
        assert_eq!(rows.row_at_y(200.0), Some(4));
        assert_eq!(rows.row_at_y(9999.0), Some(4));
    }
}
