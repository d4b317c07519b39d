use super::Document;

/// Stylesheet id of the global reset rules
pub const GLOBAL_STYLE_ID: &str = "dagit-global-style";

/// Global reset rules: border-box sizing and a full-viewport flex layout
/// with the mount root laid out as a column.
pub fn global_style(root_id: &str) -> String {
    format!(
        r#"* {{
  box-sizing: border-box;
}}

html, body, #{root} {{
  width: 100vw;
  height: 100vh;
  overflow: hidden;
  display: flex;
  flex: 1 1;
}}

#{root} {{
  display: flex;
  flex-direction: column;
  align-items: stretch;
}}

body {{
  margin: 0;
  padding: 0;
  font-family: sans-serif;
}}
"#,
        root = root_id
    )
}

/// Inject the global rules once. Returns false if they were already present.
pub fn inject_global_style(document: &mut Document, root_id: &str) -> bool {
    document.add_stylesheet(GLOBAL_STYLE_ID, global_style(root_id))
}
