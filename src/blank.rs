//! Detection of "blank" keys and values.
//!
//! The tree refuses to store a key or value that carries no information,
//! such as an empty string or a `None`. Types opt in by implementing
//! [`Blank`]; the default method reports "never blank", so plain data
//! types only need an empty impl.

use std::rc::Rc;
use std::sync::Arc;

/// Reports whether a value counts as empty for the purposes of argument
/// validation.
///
/// ```
/// use spruce::Blank;
///
/// #[derive(Clone)]
/// struct UserId(u64);
///
/// impl Blank for UserId {}
///
/// assert!(!UserId(7).is_blank());
/// assert!("".is_blank());
/// assert!(None::<u8>.is_blank());
/// ```
pub trait Blank {
	/// Returns `true` if the value is empty.
	fn is_blank(&self) -> bool {
		false
	}
}

macro_rules! never_blank {
	($($ty:ty),* $(,)?) => {
		$(impl Blank for $ty {})*
	};
}

never_blank!(
	u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, char, bool, ()
);

impl Blank for str {
	fn is_blank(&self) -> bool {
		self.is_empty()
	}
}

impl Blank for String {
	fn is_blank(&self) -> bool {
		self.is_empty()
	}
}

impl<T> Blank for [T] {
	fn is_blank(&self) -> bool {
		self.is_empty()
	}
}

impl<T> Blank for Vec<T> {
	fn is_blank(&self) -> bool {
		self.is_empty()
	}
}

impl<T> Blank for Option<T> {
	fn is_blank(&self) -> bool {
		self.is_none()
	}
}

impl<T: Blank + ?Sized> Blank for &T {
	fn is_blank(&self) -> bool {
		(**self).is_blank()
	}
}

impl<T: Blank + ?Sized> Blank for Box<T> {
	fn is_blank(&self) -> bool {
		(**self).is_blank()
	}
}

impl<T: Blank + ?Sized> Blank for Arc<T> {
	fn is_blank(&self) -> bool {
		(**self).is_blank()
	}
}

impl<T: Blank + ?Sized> Blank for Rc<T> {
	fn is_blank(&self) -> bool {
		(**self).is_blank()
	}
}
