/// 8-bit single channel raster used by the debug visualizers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>, // row-major, len = w*h
}

impl GrayImage {
    /// Image of the given size with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    /// Writes a pixel; out-of-range writes are ignored.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_respect_bounds() {
        let mut img = GrayImage::filled(4, 3, 123);
        img.set(3, 2, 7);
        img.set(4, 0, 9);
        assert_eq!(img.get(3, 2), Some(7));
        assert_eq!(img.get(0, 0), Some(123));
        assert_eq!(img.get(4, 0), None);
        assert_eq!(img.data.iter().filter(|&&v| v == 9).count(), 0);
    }
}
