use std::fmt;

use crate::headers::HeaderView;
use crate::packet::Packet;

mod element;
mod expr;

pub use element::{FilterElement, OrdinalCounter};
pub use expr::FilterParseError;

/// Conjunction of filter elements. An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    elements: Vec<FilterElement>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, element: FilterElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn add_element(&mut self, element: FilterElement) {
        self.elements.push(element);
    }

    pub fn elements(&self) -> &[FilterElement] {
        &self.elements
    }

    pub fn matches<T: AsRef<[u8]>>(&self, packet: &Packet<T>) -> bool {
        self.matches_view(&packet.headers())
    }

    // Short-circuits: elements after the first miss are not evaluated, so an
    // ordinal element only counts packets that got that far.
    pub fn matches_view(&self, view: &HeaderView) -> bool {
        self.elements.iter().all(|e| e.matches_view(view))
    }
}

impl FromIterator<FilterElement> for Filter {
    fn from_iter<I: IntoIterator<Item = FilterElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return f.write_str("any");
        }
        for (i, e) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}
