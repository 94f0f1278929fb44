use std::fmt;

/// The declared call signature of a slot.
///
/// Closures can't be inspected at runtime, so slots carry the parameter list they promise to handle.
/// The default, [`Signature::any`], is `(**kwargs)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<String>,
    var_positional: bool,
    var_keywords: bool,
}

impl Default for Signature {
    fn default() -> Self { Self::any() }
}

impl Signature {
    /// Named parameters only, without any catch-all: `(a, b)`.
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { params: params.into_iter().map(Into::into).collect(), var_positional: false, var_keywords: false }
    }

    /// Only a keyword catch-all: `(**kwargs)`.
    pub fn any() -> Self { Self { params: Vec::new(), var_positional: false, var_keywords: true } }

    /// Named parameters followed by a keyword catch-all: `(a, b, **kwargs)`.
    pub fn keywords<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(params).with_var_keywords()
    }

    pub fn with_var_keywords(mut self) -> Self {
        self.var_keywords = true;
        self
    }

    pub fn with_var_positional(mut self) -> Self {
        self.var_positional = true;
        self
    }

    pub fn params(&self) -> &[String] { &self.params }

    /// Whether arbitrary extra keyword arguments are accepted.
    pub fn accepts_keywords(&self) -> bool { self.var_keywords }

    pub fn has_var_positional(&self) -> bool { self.var_positional }

    /// Whether the named parameters equal `args` exactly, in order.
    ///
    /// A positional catch-all never matches a non-empty argument contract.
    /// The keyword catch-all is ignored here.
    pub fn matches(&self, args: &[String]) -> bool {
        if args.is_empty() {
            return true;
        }
        !self.var_positional && self.params == args
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = self.params.iter().map(String::as_str).collect();
        if self.var_positional {
            parts.push("*args");
        }
        if self.var_keywords {
            parts.push("**kwargs");
        }
        write!(f, "({})", parts.join(", "))
    }
}
