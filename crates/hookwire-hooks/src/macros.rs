//! Convenience macros for building payloads.

/// Macro for quickly building a `HookPayload`.
///
/// # Example
/// ```rust,ignore
/// let payload = hook_payload!({
///     "node" => json!("n1"),
///     "order" => json!([]),
/// });
/// ```
#[macro_export]
macro_rules! hook_payload {
    () => {
        $crate::prelude::HookPayload::new()
    };
    ({ $($key:expr => $value:expr),* $(,)? }) => {{
        let mut payload = $crate::prelude::HookPayload::new();
        $(
            payload.data.insert($key.to_string(), $value);
        )*
        payload
    }};
}
