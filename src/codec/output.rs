// Bounded byte output that remembers the root object of the encoding pass.

use crate::error::CodecError;

pub struct RootedOutput<'r, R: ?Sized> {
    buffer: Vec<u8>,
    max_size: usize,
    root: &'r R,
}

impl<'r, R: ?Sized> RootedOutput<'r, R> {
    /// Reuses `buffer`'s allocation; any existing contents are discarded.
    pub fn new(mut buffer: Vec<u8>, max_size: usize, root: &'r R) -> Self {
        buffer.clear();
        Self {
            buffer,
            max_size,
            root,
        }
    }

    /// The object this pass started from.
    pub fn root(&self) -> &'r R {
        self.root
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let needed = self.buffer.len() + bytes.len();
        if needed > self.max_size {
            return Err(CodecError::BufferOverflow {
                needed,
                max: self.max_size,
            });
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
