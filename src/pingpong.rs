/// Two equally shaped buffers where one is read while the other is written.
///
/// `current()` is the last completed write. After writing `write_target()`
/// (or the write side of `split()`), call `swap()` to make it current.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    buffers: [T; 2],
    read_index: usize,
}

impl<T> PingPong<T> {
    pub fn new(first: T, second: T) -> Self {
        Self {
            buffers: [first, second],
            read_index: 0,
        }
    }

    pub fn current(&self) -> &T {
        &self.buffers[self.read_index]
    }

    /// The buffer that was current before the last swap
    pub fn previous(&self) -> &T {
        &self.buffers[1 - self.read_index]
    }

    pub fn write_target(&mut self) -> &mut T {
        &mut self.buffers[1 - self.read_index]
    }

    /// Borrow the read side and the write side at the same time
    pub fn split(&mut self) -> (&T, &mut T) {
        let (a, b) = self.buffers.split_at_mut(1);
        if self.read_index == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        }
    }

    pub fn swap(&mut self) {
        self.read_index = 1 - self.read_index;
    }

    /// Apply `f` to both buffers
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        for buffer in &mut self.buffers {
            f(buffer);
        }
    }
}

impl<T: Clone> PingPong<T> {
    pub fn filled(value: T) -> Self {
        Self::new(value.clone(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_swap_becomes_current() {
        let mut pp = PingPong::new(1, 2);
        assert_eq!(*pp.current(), 1);
        *pp.write_target() = 10;
        assert_eq!(*pp.current(), 1);
        pp.swap();
        assert_eq!(*pp.current(), 10);
        assert_eq!(*pp.previous(), 1);
    }

    #[test]
    fn test_split_reads_previous_writes_next() {
        let mut pp = PingPong::filled(vec![0u8; 4]);
        for frame in 1..=3u8 {
            let (read, write) = pp.split();
            for (dst, src) in write.iter_mut().zip(read.iter()) {
                *dst = src + 1;
            }
            pp.swap();
            assert!(pp.current().iter().all(|v| *v == frame));
        }
    }

    #[test]
    fn test_for_each_mut_touches_both() {
        let mut pp = PingPong::new(1, 2);
        pp.for_each_mut(|v| *v = 0);
        assert_eq!(*pp.current(), 0);
        pp.swap();
        assert_eq!(*pp.current(), 0);
    }
}
