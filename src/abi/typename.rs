use std::fmt;

/// Newtype wrapper for a `&str` representing a type name that adds a few
/// convenience methods for the `?` / `[]` / `$` wrapper suffixes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName<'a>(pub &'a str);

impl<'a> TypeName<'a> {
    pub fn is_array(&self) -> bool {
        self.0.ends_with("[]")
    }

    pub fn is_optional(&self) -> bool {
        self.0.ends_with('?')
    }

    pub fn has_bin_extension(&self) -> bool {
        self.0.ends_with('$')
    }

    /// Return the type name with the last wrapper suffix removed, if any.
    ///
    /// Note that this doesn't work recursively and only removes the last
    /// suffix; if you want the innermost type you have to call this method
    /// repeatedly yourself.
    ///
    /// ## Examples
    ///
    /// ```
    /// # use sable::TypeName;
    /// assert_eq!(TypeName("int8").fundamental_type(), TypeName("int8"));
    /// assert_eq!(TypeName("int8[]").fundamental_type(), TypeName("int8"));
    /// assert_eq!(TypeName("int8[][]").fundamental_type(), TypeName("int8[]"));
    /// assert_eq!(TypeName("int8[][]?").fundamental_type(), TypeName("int8[][]"));
    /// ```
    pub fn fundamental_type(&self) -> TypeName<'a> {
        if self.is_array() {
            TypeName(&self.0[..self.0.len() - 2])
        }
        else if self.is_optional() || self.has_bin_extension() {
            TypeName(&self.0[..self.0.len() - 1])
        }
        else {
            *self
        }
    }

    pub fn remove_bin_extension(&self) -> TypeName<'a> {
        if self.has_bin_extension() {
            TypeName(&self.0[..self.0.len() - 1])
        }
        else {
            *self
        }
    }
}

impl fmt::Debug for TypeName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for TypeName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'a> From<&'a String> for TypeName<'a> {
    fn from(t: &String) -> TypeName {
        TypeName(t.as_str())
    }
}

impl<'a> From<&'a str> for TypeName<'a> {
    fn from(t: &str) -> TypeName {
        TypeName(t)
    }
}

impl<'a> From<TypeName<'a>> for &'a str {
    fn from(t: TypeName) -> &str {
        t.0
    }
}
