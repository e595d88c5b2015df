use std::ops::Index;
use std::slice;

/// Row-major 2-D buffer. `width` is the row length, `height` the number of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer2<T> {
    values: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> Buffer2<T> {
    pub fn new(width: usize, height: usize, values: Vec<T>) -> Self {
        assert_eq!(
            values.len(),
            width * height,
            "values length must equal width * height"
        );
        Self {
            values,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        assert!(y < self.height, "row {y} out of range ({})", self.height);
        let start = y * self.width;
        &self.values[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        assert!(y < self.height, "row {y} out of range ({})", self.height);
        let start = y * self.width;
        &mut self.values[start..start + self.width]
    }

    /// Iterates rows top to bottom. Yields nothing for a zero-width buffer.
    pub fn rows(&self) -> slice::ChunksExact<'_, T> {
        self.values.chunks_exact(self.width.max(1))
    }

    pub fn rows_mut(&mut self) -> slice::ChunksExactMut<'_, T> {
        self.values.chunks_exact_mut(self.width.max(1))
    }
}

impl<T: Default + Clone> Buffer2<T> {
    pub fn new_default(width: usize, height: usize) -> Self {
        Self {
            values: vec![T::default(); width * height],
            width,
            height,
        }
    }
}

impl<T: Clone> Buffer2<T> {
    pub fn new_filled(width: usize, height: usize, value: T) -> Self {
        Self {
            values: vec![value; width * height],
            width,
            height,
        }
    }

    /// Builds a buffer from equally sized rows.
    pub fn from_rows(rows: &[Vec<T>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), width, "row {y} has length {}, expected {width}", row.len());
            values.extend_from_slice(row);
        }
        Self {
            values,
            width,
            height: rows.len(),
        }
    }
}

impl<T> Index<(usize, usize)> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.values[y * self.width + x]
    }
}
