pub use serde_json::Value;

/// Keyword arguments passed to every slot on emission.
pub type Kwargs = serde_json::Map<String, Value>;

/// What a slot produces: `Ok(None)` is "absent" and lets emission continue to the next slot.
pub type SlotResult = anyhow::Result<Option<Value>>;

/// Conversion of slot return types into a [`SlotResult`].
///
/// `Value::Null` counts as absent, same as `None`.
pub trait IntoSlotResult {
    fn into_slot_result(self) -> SlotResult;
}

impl IntoSlotResult for () {
    fn into_slot_result(self) -> SlotResult { Ok(None) }
}

impl IntoSlotResult for Value {
    fn into_slot_result(self) -> SlotResult {
        match self {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }
}

impl IntoSlotResult for Option<Value> {
    fn into_slot_result(self) -> SlotResult {
        match self {
            Some(value) => value.into_slot_result(),
            None => Ok(None),
        }
    }
}

impl<T, E> IntoSlotResult for Result<T, E>
where
    T: IntoSlotResult,
    E: Into<anyhow::Error>,
{
    fn into_slot_result(self) -> SlotResult { self.map_err(Into::into)?.into_slot_result() }
}

/// Builds a [`Kwargs`] map.
///
/// ```rust
/// use signalslot::{kwargs, Value};
///
/// let kwargs = kwargs! { "foo" => "bar", "x" => 1 };
/// assert_eq!(kwargs["foo"], Value::from("bar"));
/// assert!(kwargs! {}.is_empty());
/// ```
#[macro_export]
macro_rules! kwargs {
    () => {
        $crate::Kwargs::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut kwargs = $crate::Kwargs::new();
        $(
            kwargs.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        kwargs
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_absent() {
        assert!(Value::Null.into_slot_result().unwrap().is_none());
        assert!(Some(Value::Null).into_slot_result().unwrap().is_none());
        assert_eq!(Value::from(3).into_slot_result().unwrap(), Some(Value::from(3)));
    }

    #[test]
    fn errors_are_kept() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
        let err = result.into_slot_result().unwrap_err();
        assert_eq!(err.to_string(), "boom");

        let ok: anyhow::Result<Value> = Ok(Value::from("done"));
        assert_eq!(ok.into_slot_result().unwrap(), Some(Value::from("done")));
    }
}
