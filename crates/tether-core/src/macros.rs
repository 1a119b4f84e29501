/// Build a [`Document`](crate::stmt::Document) from `field => value` pairs.
///
/// ```ignore
/// let author = doc! { "id" => 1, "name" => "A" };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::stmt::Document::new()
    };
    (
        $( $field:expr => $value:expr ),+ $(,)?
    ) => {{
        let mut document = $crate::stmt::Document::new();
        $( document.insert($field, $value); )+
        document
    }};
}
