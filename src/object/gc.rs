use log::debug;

use super::{HeapData, HeapRef, Object};

/// Mark-and-sweep, stop-the-world, precise. Owns every heap allocation made
/// by one VM; a [`Heap`] going out of scope drops every object it still
/// holds, reachable or not (matching a running VM being torn down).
#[derive(Debug, Default)]
pub struct Heap {
    objects: Vec<HeapRef>,
    capacity: usize,
    load_factor: f64,
}

impl Heap {
    pub fn new(capacity: usize, load_factor: f64) -> Self {
        Self {
            objects: Vec::with_capacity(capacity.min(1024)),
            capacity,
            load_factor,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Registers a freshly allocated heap object, running a collection
    /// first if occupancy is already past the load factor.
    pub fn track(&mut self, obj: HeapRef, roots: impl Fn() -> Vec<Object>) {
        if self.should_collect() {
            self.collect(roots());
        }
        self.objects.push(obj);
    }

    fn should_collect(&self) -> bool {
        self.objects.len() as f64 >= self.capacity as f64 * self.load_factor
    }

    pub fn collect(&mut self, roots: Vec<Object>) {
        debug!("gc: heap size before = {}", self.objects.len());

        for root in &roots {
            mark(root, true);
        }

        self.objects.retain(|obj| {
            let marked = obj.marked.get();
            if marked {
                obj.marked.set(false);
            }
            marked
        });

        debug!("gc: heap size after = {}", self.objects.len());
    }
}

/// Sets the mark bit on `obj` if it is heap-allocated, recursing into array
/// elements and (transitively, via the array's own elements) anything they
/// reach. Singletons and stack-only integers/booleans are skipped.
pub fn mark(obj: &Object, marked: bool) {
    if let Object::Heap(cell) = obj {
        if cell.marked.get() == marked {
            return;
        }
        cell.marked.set(marked);
        if let HeapData::Array(elements) = &*cell.data.borrow() {
            for element in elements {
                mark(element, marked);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_unreachable_strings() {
        let mut heap = Heap::new(4, 0.5);
        let kept = Object::string("kept");
        if let Object::Heap(cell) = &kept {
            heap.track(cell.clone(), || vec![]);
        }
        let dropped = Object::string("dropped");
        if let Object::Heap(cell) = &dropped {
            heap.track(cell.clone(), || vec![]);
        }

        assert_eq!(heap.len(), 2);
        heap.collect(vec![kept.clone()]);
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn marks_array_elements_transitively() {
        let mut heap = Heap::new(8, 0.8);
        let inner = Object::string("inner");
        let outer = Object::array(vec![inner.clone()]);

        if let Object::Heap(cell) = &inner {
            heap.track(cell.clone(), || vec![]);
        }
        if let Object::Heap(cell) = &outer {
            heap.track(cell.clone(), || vec![]);
        }

        heap.collect(vec![outer]);
        assert_eq!(heap.len(), 2, "array element must survive via its container");
    }
}
