//! Flattening of a product "Specifications" table.
//!
//! The table alternates `thead` rows naming a section with `tbody` rows holding
//! `label | value` cells:
//!
//! ```text
//! <thead><tr><td>Rotor</td></tr></thead>
//! <tbody><tr><td>Diameter</td><td>1.2 m</td></tr>...</tbody>
//! ```
//!
//! which becomes `{"Rotor": {"Diameter": "1.2 m", ...}}`.

use crate::domain::model::Specifications;
use crate::utils::error::{EtlError, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

pub const DEFAULT_CONTAINER_SELECTOR: &str = "div#tab-attribute";

fn selector(css: &str, url: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| EtlError::ParseError {
        url: url.to_string(),
        reason: format!("invalid CSS selector '{}': {:?}", css, e),
    })
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Parses the first table inside `container_selector`.
///
/// `url` is only used for error context.
pub fn parse_spec_table(html: &str, container_selector: &str, url: &str) -> Result<Specifications> {
    let document = Html::parse_document(html);
    let container_sel = selector(container_selector, url)?;
    let table_sel = selector("table", url)?;
    let td_sel = selector("td", url)?;
    let th_sel = selector("th", url)?;

    let container = document
        .select(&container_sel)
        .next()
        .ok_or_else(|| EtlError::ParseError {
            url: url.to_string(),
            reason: format!("container '{}' not found", container_selector),
        })?;

    let table = container
        .select(&table_sel)
        .next()
        .ok_or_else(|| EtlError::ParseError {
            url: url.to_string(),
            reason: format!("no table inside '{}'", container_selector),
        })?;

    let mut specifications = Specifications::new();
    // 還沒遇到 thead 之前的資料放在空字串 section 底下
    let mut current_section = String::new();

    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "thead" => {
                let header = child
                    .select(&td_sel)
                    .next()
                    .or_else(|| child.select(&th_sel).next());
                current_section = header.map(cell_text).unwrap_or_default();
                tracing::trace!("Section '{}'", current_section);
            }
            "tbody" => {
                let cells: Vec<String> = child.select(&td_sel).map(cell_text).collect();
                if cells.len() % 2 != 0 {
                    return Err(EtlError::ParseError {
                        url: url.to_string(),
                        reason: format!(
                            "section '{}' has {} cells, expected label/value pairs",
                            current_section,
                            cells.len()
                        ),
                    });
                }

                // 同名 section 合併，而不是由最後一個 tbody 整個取代
                let section = specifications
                    .entry(current_section.clone())
                    .or_insert_with(BTreeMap::new);
                for pair in cells.chunks(2) {
                    section.insert(pair[0].clone(), pair[1].clone());
                }
            }
            _ => {}
        }
    }

    Ok(specifications)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
<div id="tab-description">Rotor blades in fibreglass</div>
<div id="tab-attribute" class="tab-pane">
  <table class="table table-bordered">
    <thead><tr><td colspan="2"><strong>Rotor</strong></td></tr></thead>
    <tbody>
      <tr><td>Diameter</td><td>1.2 m</td></tr>
      <tr><td>Blades</td><td>3</td></tr>
    </tbody>
    <thead><tr><td colspan="2"><strong>Generator</strong></td></tr></thead>
    <tbody>
      <tr><td>Rated power</td><td>300 W</td></tr>
      <tr><td>Voltage</td><td>12 V</td></tr>
    </tbody>
  </table>
</div>
</body></html>
"#;

    #[test]
    fn test_parse_sections_and_pairs() {
        let specs = parse_spec_table(PAGE, DEFAULT_CONTAINER_SELECTOR, "test").unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs["Rotor"]["Diameter"], "1.2 m");
        assert_eq!(specs["Rotor"]["Blades"], "3");
        assert_eq!(specs["Generator"]["Rated power"], "300 W");
        assert_eq!(specs["Generator"].len(), 2);
    }

    #[test]
    fn test_label_value_cells_in_one_row() {
        let html = r#"<div id="tab-attribute"><table>
            <thead><tr><td>Rotor</td></tr></thead>
            <tbody><tr><td>label1</td><td>value1</td><td>label2</td><td>value2</td></tr></tbody>
            <thead><tr><td>Generator</td></tr></thead>
        </table></div>"#;

        let specs = parse_spec_table(html, DEFAULT_CONTAINER_SELECTOR, "test").unwrap();

        let mut expected = BTreeMap::new();
        expected.insert("label1".to_string(), "value1".to_string());
        expected.insert("label2".to_string(), "value2".to_string());
        assert_eq!(specs["Rotor"], expected);
        // 沒有 tbody 的 section 不會出現
        assert!(!specs.contains_key("Generator"));
    }

    #[test]
    fn test_missing_container_is_an_error() {
        let err = parse_spec_table("<html><body></body></html>", DEFAULT_CONTAINER_SELECTOR, "p1")
            .unwrap_err();
        match err {
            EtlError::ParseError { url, reason } => {
                assert_eq!(url, "p1");
                assert!(reason.contains("not found"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_odd_cell_count_is_an_error() {
        let html = r#"<div id="tab-attribute"><table>
            <thead><tr><td>Rotor</td></tr></thead>
            <tbody><tr><td>Diameter</td><td>1.2 m</td><td>Blades</td></tr></tbody>
        </table></div>"#;

        assert!(matches!(
            parse_spec_table(html, DEFAULT_CONTAINER_SELECTOR, "test"),
            Err(EtlError::ParseError { .. })
        ));
    }

    #[test]
    fn test_body_before_any_header_goes_to_empty_section() {
        let html = r#"<div id="tab-attribute"><table>
            <tbody><tr><td>Warranty</td><td>2 years</td></tr></tbody>
            <thead><tr><th>Rotor</th></tr></thead>
            <tbody><tr><td>Diameter</td><td>1.2 m</td></tr></tbody>
        </table></div>"#;

        let specs = parse_spec_table(html, DEFAULT_CONTAINER_SELECTOR, "test").unwrap();

        assert_eq!(specs[""]["Warranty"], "2 years");
        assert_eq!(specs["Rotor"]["Diameter"], "1.2 m");
    }

    /// Older scrapes kept only the last `tbody` of a repeated section.
    #[test]
    fn test_repeated_section_merges_instead_of_last_body_replacing() {
        let html = r#"<div id="tab-attribute"><table>
            <thead><tr><td>Rotor</td></tr></thead>
            <tbody><tr><td>Diameter</td><td>1.2 m</td><td>Blades</td><td>2</td></tr></tbody>
            <thead><tr><td>Rotor</td></tr></thead>
            <tbody><tr><td>Blades</td><td>3</td></tr></tbody>
        </table></div>"#;

        let specs = parse_spec_table(html, DEFAULT_CONTAINER_SELECTOR, "test").unwrap();

        assert_eq!(specs["Rotor"].len(), 2);
        assert_eq!(specs["Rotor"]["Diameter"], "1.2 m");
        // 後出現的 label 覆蓋前面的值
        assert_eq!(specs["Rotor"]["Blades"], "3");
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        assert!(parse_spec_table(PAGE, "div[", "test").is_err());
    }
}
