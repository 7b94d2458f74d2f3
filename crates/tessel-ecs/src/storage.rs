//! Dense storage - type-erased fixed-stride buffers.
//!
//! A [`DenseStore`] holds elements of a single plain-data shape in one
//! contiguous allocation aligned for that shape. The store itself only
//! knows the shape's layout; typed access goes through accessors bounded by
//! [`bytemuck::Pod`], so no raw pointer ever leaves this module.

use std::{alloc::Layout, ptr::NonNull};

use bytemuck::Pod;

use crate::registry::ShapeInfo;

/// Growable buffer of fixed-size elements with O(1) swap-removal.
pub struct DenseStore {
    /// Pointer to the element array, aligned for the shape.
    data: NonNull<u8>,
    /// Number of elements stored.
    len: usize,
    /// Allocated capacity (in elements).
    capacity: usize,
    /// Shape of every element.
    info: ShapeInfo,
}

// SAFETY: the store owns its allocation exclusively and only ever holds
// `Pod` bytes, which carry no thread affinity.
unsafe impl Send for DenseStore {}
unsafe impl Sync for DenseStore {}

impl DenseStore {
    /// Create an empty store for the given shape.
    #[must_use]
    pub fn new(info: ShapeInfo) -> Self {
        Self {
            data: dangling(info.align()),
            len: 0,
            capacity: if info.size() == 0 { usize::MAX } else { 0 },
            info,
        }
    }

    /// Create a store with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(info: ShapeInfo, capacity: usize) -> Self {
        let mut store = Self::new(info);
        store.reserve(capacity);
        store
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn info(&self) -> &ShapeInfo {
        &self.info
    }

    /// Byte width of one element.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.info.size()
    }

    /// Append raw element bytes, returning the new element's index.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not exactly one stride long.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> usize {
        assert_eq!(bytes.len(), self.stride(), "element size mismatch");
        self.reserve(1);

        let index = self.len;
        self.len += 1;
        let stride = self.stride();
        self.as_bytes_mut()[index * stride..(index + 1) * stride].copy_from_slice(bytes);
        index
    }

    /// Append a typed element, returning its index.
    pub fn push<T: Pod>(&mut self, value: T) -> usize {
        self.assert_shape::<T>();
        self.push_bytes(bytemuck::bytes_of(&value))
    }

    /// Overwrite the element at `index` with raw bytes.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or `bytes` is not one stride long.
    pub fn set_bytes(&mut self, index: usize, bytes: &[u8]) {
        assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        assert_eq!(bytes.len(), self.stride(), "element size mismatch");

        let stride = self.stride();
        self.as_bytes_mut()[index * stride..(index + 1) * stride].copy_from_slice(bytes);
    }

    /// Overwrite the element at `index`.
    pub fn set<T: Pod>(&mut self, index: usize, value: T) {
        self.assert_shape::<T>();
        self.set_bytes(index, bytemuck::bytes_of(&value));
    }

    /// Raw bytes of the element at `index`.
    #[must_use]
    pub fn slot_bytes(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len {
            return None;
        }
        let stride = self.stride();
        Some(&self.as_bytes()[index * stride..(index + 1) * stride])
    }

    #[must_use]
    pub fn get<T: Pod>(&self, index: usize) -> Option<&T> {
        self.as_slice::<T>().get(index)
    }

    pub fn get_mut<T: Pod>(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice::<T>().get_mut(index)
    }

    /// View every element as `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the store's shape.
    #[must_use]
    pub fn as_slice<T: Pod>(&self) -> &[T] {
        self.assert_shape::<T>();
        // SAFETY: `data` is aligned for the shape and holds `len` initialized
        // elements; `T` is that shape and every bit pattern is valid for it.
        unsafe { std::slice::from_raw_parts(self.data.as_ptr().cast::<T>(), self.len) }
    }

    /// Mutable view of every element as `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the store's shape.
    pub fn as_mut_slice<T: Pod>(&mut self) -> &mut [T] {
        self.assert_shape::<T>();
        // SAFETY: as in `as_slice`, and `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr().cast::<T>(), self.len) }
    }

    /// All initialized bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the first `len * stride` bytes of the allocation are initialized.
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), self.len * self.stride()) }
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as in `as_bytes`, and `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.data.as_ptr(), self.len * self.stride()) }
    }

    /// Remove the element at `index` by moving the last element into its slot.
    ///
    /// Returns the old index of the element that was moved into `index`, or
    /// `None` if `index` was the last element. Callers keeping an external
    /// index must repoint whatever referenced the returned slot.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn swap_remove(&mut self, index: usize) -> Option<usize> {
        assert!(index < self.len, "index {index} out of bounds ({})", self.len);

        let last = self.len - 1;
        if index != last {
            let stride = self.stride();
            self.as_bytes_mut()
                .copy_within(last * stride..(last + 1) * stride, index * stride);
        }
        self.len = last;

        (index != last).then_some(last)
    }

    /// Forget every element, keeping the allocation.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Reserve capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        let required = self
            .len
            .checked_add(additional)
            .expect("capacity overflow");

        if required > self.capacity {
            self.grow(required);
        }
    }

    /// Grow to at least `min_capacity`, doubling.
    fn grow(&mut self, min_capacity: usize) {
        let new_capacity = self
            .capacity
            .checked_mul(2)
            .unwrap_or(min_capacity)
            .max(min_capacity)
            .max(4);

        let new_layout = self.array_layout(new_capacity);

        // SAFETY: the layout is non-zero (zero-sized shapes never grow) and
        // `data` was allocated with `array_layout(capacity)` when non-empty.
        let new_data = unsafe {
            if self.capacity == 0 {
                std::alloc::alloc(new_layout)
            } else {
                let old_layout = self.array_layout(self.capacity);
                std::alloc::realloc(self.data.as_ptr(), old_layout, new_layout.size())
            }
        };

        self.data =
            NonNull::new(new_data).unwrap_or_else(|| std::alloc::handle_alloc_error(new_layout));
        self.capacity = new_capacity;
    }

    fn array_layout(&self, count: usize) -> Layout {
        let size = self
            .info
            .size()
            .checked_mul(count)
            .expect("layout overflow");
        Layout::from_size_align(size, self.info.align()).expect("layout overflow")
    }

    fn assert_shape<T: 'static>(&self) {
        assert!(
            self.info.is::<T>(),
            "shape mismatch: store holds `{}`, accessed as `{}`",
            self.info.name(),
            std::any::type_name::<T>()
        );
    }
}

impl Drop for DenseStore {
    fn drop(&mut self) {
        if self.info.size() > 0 && self.capacity > 0 {
            let layout = self.array_layout(self.capacity);
            // SAFETY: `data` was allocated with this layout.
            unsafe { std::alloc::dealloc(self.data.as_ptr(), layout) };
        }
    }
}

impl core::fmt::Debug for DenseStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DenseStore")
            .field("shape", &self.info.name())
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// A non-null pointer aligned for `align`, for stores without an allocation.
fn dangling(align: usize) -> NonNull<u8> {
    NonNull::new(std::ptr::without_provenance_mut(align)).unwrap_or(NonNull::dangling())
}
