use geo::{coord, BoundingRect, Coord, MultiPoint, Point, Rect};
use serde::{Deserialize, Serialize};
use crate::config::GridConfig;
use crate::error::{PrescriptionError, Result};

/// Georeference of a grid in the order raster sinks expect: top-left corner,
/// positive cell width, negative cell height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDescriptor {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub rows: usize,
    pub cols: usize,
}

/// Regular lattice of query points. Cells tile the padded extent exactly; each
/// query point is a cell center. Row 0 is the top (maximum y) row.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    extent: Rect<f64>,
    rows: usize,
    cols: usize,
}

impl Grid {
    pub fn new(extent: Rect<f64>, rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(PrescriptionError::invalid_config("grid.rows", format!("{}x{}", rows, cols), "grid needs at least one cell"));
        }
        if !(extent.width() > 0.0 && extent.height() > 0.0) {
            return Err(PrescriptionError::DegenerateExtent { width: extent.width(), height: extent.height() });
        }
        Ok(Grid { extent, rows, cols })
    }

    pub fn extent(&self) -> Rect<f64> {
        self.extent
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn origin_x(&self) -> f64 {
        self.extent.min().x
    }

    pub fn origin_y(&self) -> f64 {
        self.extent.max().y
    }

    pub fn cell_width(&self) -> f64 {
        self.extent.width() / self.cols as f64
    }

    pub fn cell_height(&self) -> f64 {
        self.extent.height() / self.rows as f64
    }

    pub fn descriptor(&self) -> GridDescriptor {
        GridDescriptor {
            origin_x: self.origin_x(),
            origin_y: self.origin_y(),
            cell_width: self.cell_width(),
            cell_height: -self.cell_height(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Six-term affine transform `[origin_x, cell_width, 0, origin_y, 0, -cell_height]`.
    pub fn geo_transform(&self) -> [f64; 6] {
        [self.origin_x(), self.cell_width(), 0.0, self.origin_y(), 0.0, -self.cell_height()]
    }

    pub fn cell_center(&self, row: usize, col: usize) -> Coord<f64> {
        coord! {
            x: self.origin_x() + (col as f64 + 0.5) * self.cell_width(),
            y: self.origin_y() - (row as f64 + 0.5) * self.cell_height(),
        }
    }

    /// Cell whose footprint contains `(x, y)`; points on the outer boundary belong to
    /// the edge cells.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !(x.is_finite() && y.is_finite()) || !self.is_inside(Point::new(x, y)) {
            return None;
        }
        let col = ((x - self.origin_x()) / self.cell_width()).floor() as usize;
        let row = ((self.origin_y() - y) / self.cell_height()).floor() as usize;
        Some((row.min(self.rows - 1), col.min(self.cols - 1)))
    }

    pub fn is_inside(&self, pt: Point) -> bool {
        let (min, max) = (self.extent.min(), self.extent.max());
        !(pt.x() < min.x || pt.x() > max.x || pt.y() < min.y || pt.y() > max.y)
    }

    /// Cell centers in row-major order.
    pub fn query_points(&self) -> Vec<[f64; 2]> {
        let mut points = Vec::with_capacity(self.len());
        for row in 0..self.rows {
            for col in 0..self.cols {
                let c = self.cell_center(row, col);
                points.push([c.x, c.y]);
            }
        }
        points
    }
}

pub struct GridBuilder {
    config: GridConfig,
}

impl GridBuilder {
    pub fn new(config: GridConfig) -> Self {
        GridBuilder { config }
    }

    /// Bounding box of `coords`, padded by the margin on every side.
    pub fn extent(&self, coords: &[[f64; 2]]) -> Result<Rect<f64>> {
        self.config.validate()?;
        let points: MultiPoint<f64> = coords.iter().map(|&[x, y]| Point::new(x, y)).collect();
        let bbox = points.bounding_rect()
            .ok_or(PrescriptionError::InsufficientSamples { found: 0, required: 1 })?;
        let margin = self.config.margin;
        let padded = Rect::new(
            coord! { x: bbox.min().x - margin, y: bbox.min().y - margin },
            coord! { x: bbox.max().x + margin, y: bbox.max().y + margin },
        );
        if !(padded.width() > 0.0 && padded.height() > 0.0) {
            return Err(PrescriptionError::DegenerateExtent { width: padded.width(), height: padded.height() });
        }
        Ok(padded)
    }

    pub fn build(&self, coords: &[[f64; 2]]) -> Result<Grid> {
        let extent = self.extent(coords)?;
        Grid::new(extent, self.config.rows, self.config.cols)
    }
}
