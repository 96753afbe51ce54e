use nalgebra::Vector2;
use serde::Deserialize;

/// A cell of the grid. Columns grow along the image x axis, rows along the image y axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Cell {
    pub column: usize,
    pub row: usize,
}

impl Cell {
    pub fn new(column: usize, row: usize) -> Self {
        Cell { column, row }
    }
}

/// An owned 2D raster with an explicit size. All accessors are bounds-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct GridData<T> {
    /** the size of the grid in cells (x = columns, y = rows) */
    size: Vector2<usize>,

    /// Vector containing all the data values
    data: Vec<T>,
}

impl<T> GridData<T> {
    /// Wraps row-major `data` in a grid of `width` columns and `height` rows.
    ///
    /// # Panics
    /// If `data` does not hold exactly `width * height` values.
    pub fn from_raw(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "raw grid data does not match the grid size"
        );

        Self {
            size: Vector2::new(width, height),
            data,
        }
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        // Row-major order
        self.contains(cell)
            .then(|| cell.row * self.size.x + cell.column)
    }

    fn cell(&self, index: usize) -> Cell {
        // Row-major order
        assert!(index < self.data.len());

        Cell {
            row: index / self.size.x,
            column: index % self.size.x,
        }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.column < self.size.x && cell.row < self.size.y
    }

    /// Converts a possibly negative grid coordinate into a `Cell`, or `None` if it lies
    /// outside of this grid.
    pub fn cell_at(&self, column: isize, row: isize) -> Option<Cell> {
        let cell = Cell::new(usize::try_from(column).ok()?, usize::try_from(row).ok()?);
        self.contains(cell).then_some(cell)
    }

    pub fn get(&self, cell: Cell) -> Option<&T> {
        self.index(cell).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, cell: Cell) -> Option<&mut T> {
        let index = self.index(cell)?;
        Some(&mut self.data[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = (Cell, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (self.cell(i), v))
    }

    pub fn size(&self) -> Vector2<usize> {
        self.size
    }

    pub fn width(&self) -> usize {
        self.size.x
    }

    pub fn height(&self) -> usize {
        self.size.y
    }

    /// The raw row-major data.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: Clone> GridData<T> {
    pub fn new_fill(width: usize, height: usize, initial_value: T) -> Self {
        Self {
            size: Vector2::new(width, height),
            data: vec![initial_value; width * height],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_layout() {
        let mut grid = GridData::new_fill(4, 3, 0u8);
        *grid.get_mut(Cell::new(2, 1)).unwrap() = 7;

        assert_eq!(grid.as_slice()[4 + 2], 7);
        assert_eq!(grid.get(Cell::new(2, 1)), Some(&7));
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.height(), 3);
    }

    #[test]
    fn out_of_bounds_access_is_rejected() {
        let mut grid = GridData::new_fill(4, 3, 0u8);

        assert!(grid.get(Cell::new(4, 0)).is_none());
        assert!(grid.get(Cell::new(0, 3)).is_none());
        assert!(grid.get_mut(Cell::new(10, 10)).is_none());
        assert!(grid.iter().all(|&v| v == 0));
    }

    #[test]
    fn signed_coordinates() {
        let grid = GridData::new_fill(4, 3, 0u8);

        assert_eq!(grid.cell_at(3, 2), Some(Cell::new(3, 2)));
        assert_eq!(grid.cell_at(-1, 0), None);
        assert_eq!(grid.cell_at(0, -1), None);
        assert_eq!(grid.cell_at(4, 0), None);
    }

    #[test]
    fn iter_cells_visits_in_row_major_order() {
        let grid = GridData::from_raw(2, 2, vec![1, 2, 3, 4]);
        let cells: Vec<_> = grid.iter_cells().map(|(c, &v)| (c.column, c.row, v)).collect();

        assert_eq!(cells, vec![(0, 0, 1), (1, 0, 2), (0, 1, 3), (1, 1, 4)]);
    }

    #[test]
    #[should_panic]
    fn raw_data_must_match_size() {
        GridData::from_raw(2, 2, vec![0u8; 3]);
    }
}
