use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type Destructor = Box<dyn FnOnce(String, Vec<u8>) + Send>;

struct ContentInner {
    mime_type: String,
    data: Vec<u8>,
    destructor: Mutex<Option<Destructor>>,
}

impl Drop for ContentInner {
    fn drop(&mut self) {
        if let Some(destructor) = self.destructor.get_mut().take() {
            let mime_type = std::mem::take(&mut self.mime_type);
            let data = std::mem::take(&mut self.data);
            destructor(mime_type, data);
        }
    }
}

/// MIME-typed binary payload with shared ownership.
///
/// Cloning adds a reference to the same payload. When the last reference goes away the
/// destructor, if any, receives the MIME type and the bytes.
#[derive(Clone)]
pub struct Content {
    inner: Arc<ContentInner>,
}

impl Content {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Content {
            inner: Arc::new(ContentInner {
                mime_type: mime_type.into(),
                data,
                destructor: Mutex::new(None),
            }),
        }
    }

    pub fn with_destructor<F>(mime_type: impl Into<String>, data: Vec<u8>, destructor: F) -> Self
    where
        F: FnOnce(String, Vec<u8>) + Send + 'static,
    {
        Content {
            inner: Arc::new(ContentInner {
                mime_type: mime_type.into(),
                data,
                destructor: Mutex::new(Some(Box::new(destructor))),
            }),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.inner.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.inner.data
    }

    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }

    /// Number of live references to the payload, this one included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether both refer to the same payload.
    pub fn ptr_eq(&self, other: &Content) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.mime_type() == other.mime_type() && self.data() == other.data())
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Content")
            .field("mime_type", &self.mime_type())
            .field("len", &self.len())
            .field("refs", &self.ref_count())
            .finish()
    }
}
