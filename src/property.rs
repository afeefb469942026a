//! Accessors for values that live outside the element tree.

use crate::context::UiContext;

/// Callback run with the coordinator, e.g. a button click.
pub type Action = Box<dyn FnMut(&mut UiContext)>;

/// A readable, optionally writable external value.
pub enum Property<T> {
    ReadOnly(Box<dyn Fn() -> T>),
    ReadWrite {
        get: Box<dyn Fn() -> T>,
        set: Box<dyn FnMut(T)>,
    },
}

impl<T> Property<T> {
    pub fn read_only(get: impl Fn() -> T + 'static) -> Self {
        Property::ReadOnly(Box::new(get))
    }

    pub fn read_write(get: impl Fn() -> T + 'static, set: impl FnMut(T) + 'static) -> Self {
        Property::ReadWrite {
            get: Box::new(get),
            set: Box::new(set),
        }
    }

    pub fn get(&self) -> T {
        match self {
            Property::ReadOnly(get) => get(),
            Property::ReadWrite { get, .. } => get(),
        }
    }

    /// Ignored for read-only properties.
    pub fn set(&mut self, value: T) {
        if let Property::ReadWrite { set, .. } = self {
            set(value);
        }
    }

    pub fn is_readonly(&self) -> bool {
        matches!(self, Property::ReadOnly(_))
    }
}

impl<T> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_readonly() {
            "ReadOnly"
        } else {
            "ReadWrite"
        };
        write!(f, "Property::{kind}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_read_write_round_trips_through_closures() {
        let cell = Rc::new(Cell::new(3));
        let (r, w) = (cell.clone(), cell.clone());
        let mut p = Property::read_write(move || r.get(), move |v| w.set(v));
        assert!(!p.is_readonly());
        p.set(9);
        assert_eq!(cell.get(), 9);
        assert_eq!(p.get(), 9);
    }

    #[test]
    fn test_read_only_ignores_set() {
        let mut p = Property::read_only(|| 5);
        assert!(p.is_readonly());
        p.set(1);
        assert_eq!(p.get(), 5);
    }
}
