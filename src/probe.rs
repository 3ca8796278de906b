//! Probes: independent checks against the current page state
//!
//! Each probe compiles to a script fragment wrapped in its own try/catch that
//! always emits a tagged result event, so one probe's failure never stops the
//! rest of the sequence.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

/// Strategy for finding a UI element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// Input placeholder text
    Placeholder(String),
    /// Accessible role plus accessible name
    Role { role: String, name: String },
    /// DOM element id
    Id(String),
}

impl Locator {
    /// Playwright locator expression for this strategy.
    pub fn to_js(&self) -> String {
        match self {
            Locator::Placeholder(text) => {
                format!("page.getByPlaceholder({})", js_str(text))
            }
            Locator::Role { role, name } => {
                format!(
                    "page.getByRole({}, {{ name: {} }})",
                    js_str(role),
                    js_str(name)
                )
            }
            Locator::Id(id) => format!("page.locator({})", js_str(&format!("#{id}"))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Locator::Placeholder(text) => format!("placeholder:{text}"),
            Locator::Role { role, name } => format!("{role}:{name}"),
            Locator::Id(id) => format!("id:{id}"),
        }
    }
}

/// One independent check performed against the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Probe {
    /// Record the page title verbatim; asserts nothing by itself.
    Title,

    /// Resolve a locator and observe whether it is currently visible.
    /// Absence is an observation, not a harness fault.
    Visibility { locator: Locator },

    /// Capture a full-viewport screenshot, overwriting any prior file.
    Screenshot { file: String },

    /// Marker recorded when the intended route requires privileges the run
    /// does not have and a public fallback is being verified instead.
    RouteUnreachable { route: String },
}

impl Probe {
    pub fn name(&self) -> String {
        match self {
            Probe::Title => "title".to_string(),
            Probe::Visibility { locator } => format!("visibility:{}", locator.describe()),
            Probe::Screenshot { file } => format!("screenshot:{file}"),
            Probe::RouteUnreachable { .. } => "route-reachability".to_string(),
        }
    }

    /// Compile this probe to its script fragment. `index` ties the emitted
    /// event back to the plan entry when the stream is decoded.
    pub fn to_js(&self, index: usize, screenshot_dir: &Path) -> String {
        match self {
            Probe::Title => format!(
                r#"  try {{
    const title = await page.title();
    emit({{ event: "probe", index: {index}, status: "pass", observed: title }});
  }} catch (err) {{
    emit({{ event: "probe", index: {index}, status: "fail", note: String(err && err.message || err) }});
  }}
"#
            ),
            Probe::Visibility { locator } => format!(
                r#"  try {{
    const visible = await {locator}.isVisible();
    emit({{ event: "probe", index: {index}, status: visible ? "pass" : "fail", observed: visible, note: visible ? null : "element absent or hidden" }});
  }} catch (err) {{
    emit({{ event: "probe", index: {index}, status: "fail", note: String(err && err.message || err) }});
  }}
"#,
                locator = locator.to_js(),
            ),
            Probe::Screenshot { file } => {
                let path = screenshot_dir.join(file);
                let path_js = js_str(&path.to_string_lossy());
                format!(
                    r#"  try {{
    await page.screenshot({{ path: {path_js}, fullPage: false }});
    emit({{ event: "probe", index: {index}, status: "pass", observed: {path_js} }});
  }} catch (err) {{
    emit({{ event: "probe", index: {index}, status: "fail", note: String(err && err.message || err) }});
  }}
"#
                )
            }
            Probe::RouteUnreachable { route } => {
                let note = js_str(&format!(
                    "route {route} requires privileges this run does not have; verifying public fallback instead"
                ));
                format!(
                    r#"  emit({{ event: "probe", index: {index}, status: "inconclusive", note: {note} }});
"#
                )
            }
        }
    }

    /// Where a screenshot probe writes its file, if it is one.
    pub fn screenshot_path(&self, screenshot_dir: &Path) -> Option<PathBuf> {
        match self {
            Probe::Screenshot { file } => Some(screenshot_dir.join(file)),
            _ => None,
        }
    }
}

/// Tagged outcome of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Pass,
    Fail,
    Inconclusive,
}

/// What a probe observed, typed by probe kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    Title(String),
    Visible(bool),
    Screenshot(PathBuf),
    None,
}

/// Immutable record of one probe's outcome, appended in probe order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub name: String,
    pub status: ProbeStatus,
    pub observation: Observation,
    pub note: Option<String>,
}

/// JSON string literal, doubling as the JS escaper for generated scripts.
pub(crate) fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Locator::Placeholder("Banner".into()), "page.getByPlaceholder(\"Banner\")"; "placeholder")]
    #[test_case(Locator::Role { role: "button".into(), name: "Cari".into() }, "page.getByRole(\"button\", { name: \"Cari\" })"; "role and name")]
    #[test_case(Locator::Id("produk".into()), "page.locator(\"#produk\")"; "dom id")]
    fn test_locator_js(locator: Locator, expected: &str) {
        assert_eq!(locator.to_js(), expected);
    }

    #[test]
    fn test_probe_names() {
        assert_eq!(Probe::Title.name(), "title");
        assert_eq!(
            Probe::Visibility { locator: Locator::Placeholder("Banner".into()) }.name(),
            "visibility:placeholder:Banner"
        );
        assert_eq!(
            Probe::Screenshot { file: "search_design.png".into() }.name(),
            "screenshot:search_design.png"
        );
    }

    #[test]
    fn test_probe_fragments_are_self_contained() {
        let dir = Path::new("verification");
        for (index, probe) in [
            Probe::Title,
            Probe::Visibility { locator: Locator::Id("produk".into()) },
            Probe::Screenshot { file: "x.png".into() },
        ]
        .iter()
        .enumerate()
        {
            let js = probe.to_js(index, dir);
            // Every failure path must still emit a tagged event for this index.
            assert!(js.contains("try {"), "{js}");
            assert!(js.contains("catch (err)"), "{js}");
            assert!(js.contains(&format!("index: {index}")), "{js}");
        }
    }

    #[test]
    fn test_reachability_marker_is_inconclusive() {
        let probe = Probe::RouteUnreachable { route: "/products/new".into() };
        let js = probe.to_js(0, Path::new("verification"));
        assert!(js.contains("\"inconclusive\""));
        assert!(js.contains("/products/new"));
    }

    #[test]
    fn test_screenshot_path_joins_dir() {
        let probe = Probe::Screenshot { file: "login_page.png".into() };
        assert_eq!(
            probe.screenshot_path(Path::new("verification")),
            Some(PathBuf::from("verification/login_page.png"))
        );
        assert_eq!(Probe::Title.screenshot_path(Path::new("verification")), None);
    }

    #[test]
    fn test_js_str_escapes_quotes() {
        assert_eq!(js_str(r#"a"b"#), r#""a\"b""#);
    }
}
