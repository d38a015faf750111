// ── HTML extraction for the status table and detail pages ──
//
// The feeds only ever serve two fixed page layouts, so instead of a full DOM
// this module tracks open/close tags of a single element name at a time.
// Nested same-name elements belong to their outermost parent; unclosed
// elements extend to the end of the fragment.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::Error;
use crate::models::{RawChart, RawDetail, RawStatusRow};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(/?)([A-Za-z][A-Za-z0-9]*)\b([^>]*)>").expect("tag regex")
});

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex"));

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attribute regex")
});

static IMG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b([^>]*)>").expect("img regex"));

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[A-Za-z]+);").expect("entity regex"));

static STATUS_WINDOW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)openStatusWindow\((\d+)\)").expect("onclick regex"));

static LEADING_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:：]+)[:：]").expect("label regex"));

static UPTIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)uptime|運行時間").expect("uptime regex"));

static UPTIME_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:uptime|運行時間)[:：]?\s*").expect("uptime prefix regex"));

static PRIVATE_IP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)private\s*ip|內部地址").expect("private ip regex"));

static PRIVATE_IP_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:private\s*ip|內部地址)[:：]?\s*").expect("private ip prefix regex")
});

/// A matched element within a fragment.
#[derive(Debug, Clone)]
pub(crate) struct Element<'a> {
    pub attrs: &'a str,
    pub inner: &'a str,
    /// Byte range of the whole element (open tag to close tag) in the fragment.
    pub outer: Range<usize>,
}

/// Top-level elements named `tag` in `html`.
pub(crate) fn elements<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut open: Option<(usize, usize, &'a str)> = None;

    for caps in TAG_RE.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        let is_match = caps
            .get(2)
            .is_some_and(|name| name.as_str().eq_ignore_ascii_case(tag));
        if !is_match {
            continue;
        }
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());

        if closing {
            if depth == 0 {
                continue;
            }
            depth -= 1;
            if depth == 0 {
                if let Some((outer_start, inner_start, attrs)) = open.take() {
                    out.push(Element {
                        attrs,
                        inner: &html[inner_start..whole.start()],
                        outer: outer_start..whole.end(),
                    });
                }
            }
        } else {
            if depth == 0 {
                let attrs = caps.get(3).map_or("", |m| m.as_str());
                open = Some((whole.start(), whole.end(), attrs));
            }
            depth += 1;
        }
    }

    if let Some((outer_start, inner_start, attrs)) = open {
        out.push(Element {
            attrs,
            inner: &html[inner_start..],
            outer: outer_start..html.len(),
        });
    }
    out
}

/// First element named `tag`, at any depth, whose attributes satisfy `pred`.
pub(crate) fn find_element<'a>(
    html: &'a str,
    tag: &str,
    pred: impl Fn(&str) -> bool,
) -> Option<Element<'a>> {
    for caps in TAG_RE.captures_iter(html) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if closing || !name.as_str().eq_ignore_ascii_case(tag) {
            continue;
        }
        if pred(caps.get(3).map_or("", |m| m.as_str())) {
            let start = whole.start();
            return elements(&html[start..], tag).into_iter().next().map(|el| Element {
                outer: el.outer.start + start..el.outer.end + start,
                ..el
            });
        }
    }
    None
}

/// Value of attribute `name` (case-insensitive) in an open tag's attribute text.
pub(crate) fn attr(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE.captures_iter(attrs).find_map(|caps| {
        let key = caps.get(1)?;
        if !key.as_str().eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| decode_entities(m.as_str()))
    })
}

pub(crate) fn has_class(attrs: &str, class: &str) -> bool {
    attr(attrs, "class").is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Copy of `html` with every top-level element of the given tags cut out.
pub(crate) fn remove_elements(html: &str, tags: &[&str]) -> String {
    let mut current = html.to_owned();
    for tag in tags {
        if tag.eq_ignore_ascii_case("img") {
            current = IMG_RE.replace_all(&current, "").into_owned();
            continue;
        }
        let ranges: Vec<Range<usize>> = elements(&current, tag).into_iter().map(|e| e.outer).collect();
        if ranges.is_empty() {
            continue;
        }
        let mut kept = String::with_capacity(current.len());
        let mut cursor = 0;
        for range in ranges {
            kept.push_str(&current[cursor..range.start]);
            cursor = range.end;
        }
        kept.push_str(&current[cursor..]);
        current = kept;
    }
    current
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of a fragment: tags dropped, entities decoded, whitespace collapsed.
pub(crate) fn text_content(html: &str) -> String {
    let without_comments = COMMENT_RE.replace_all(html, "");
    let without_tags = TAG_RE.replace_all(&without_comments, "");
    normalize_text(&decode_entities(&without_tags))
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "nbsp" => Some(' '),
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_owned(), String::from)
        })
        .into_owned()
}

fn absolute_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_owned()
    } else if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_owned()
    }
}

// ── Status table ─────────────────────────────────────────────────────

/// Extract the rows of the `#staticnodes_table` status table.
///
/// Rows with fewer than five cells or without an `openStatusWindow(<id>)`
/// handler are skipped; a page without the table is rejected outright.
pub fn parse_status_table(html: &str) -> Result<Vec<RawStatusRow>, Error> {
    let table = find_element(html, "table", |attrs| {
        attr(attrs, "id").as_deref() == Some("staticnodes_table")
    })
    .ok_or_else(|| Error::UnexpectedShape("status table #staticnodes_table not found".into()))?;

    let body = elements(table.inner, "tbody")
        .into_iter()
        .next()
        .map_or(table.inner, |tbody| tbody.inner);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for tr in elements(body, "tr") {
        let cells = elements(tr.inner, "td");
        let [_, id_cell, load_cell, traffic_cell, congestion_cell, ..] = cells.as_slice() else {
            skipped += 1;
            continue;
        };
        let sid = attr(id_cell.attrs, "onclick")
            .and_then(|handler| STATUS_WINDOW_RE.captures(&handler).map(|c| c[1].to_owned()));
        let Some(sid) = sid else {
            skipped += 1;
            continue;
        };

        rows.push(RawStatusRow {
            sid,
            system_load: text_content(load_cell.inner).split_whitespace().collect(),
            traffic: text_content(traffic_cell.inner),
            congestion: text_content(congestion_cell.inner),
        });
    }

    if skipped > 0 {
        debug!(skipped, parsed = rows.len(), "skipped malformed status rows");
    }
    Ok(rows)
}

// ── Detail page ──────────────────────────────────────────────────────

fn item_label(li_inner: &str) -> String {
    let stripped = remove_elements(li_inner, &["ul", "ol", "img"]);
    let strong = elements(&stripped, "strong")
        .into_iter()
        .chain(elements(&stripped, "b"))
        .map(|el| text_content(el.inner))
        .find(|t| !t.is_empty());
    if let Some(label) = strong {
        return label;
    }
    let text = text_content(&stripped);
    if let Some(caps) = LEADING_LABEL_RE.captures(&text) {
        return normalize_text(&caps[1]);
    }
    text.split_whitespace().next().unwrap_or_default().to_owned()
}

fn item_value(li_inner: &str) -> String {
    let stripped = remove_elements(li_inner, &["ul", "ol"]);
    let text = text_content(&stripped);
    if let Some(idx) = text.find([':', '：']) {
        let colon_len = text[idx..].chars().next().map_or(1, char::len_utf8);
        return normalize_text(&text[idx + colon_len..]);
    }
    let strong = elements(&stripped, "strong")
        .into_iter()
        .chain(elements(&stripped, "b"))
        .map(|el| text_content(el.inner))
        .find(|t| !t.is_empty());
    match strong {
        Some(label) => normalize_text(text.strip_prefix(label.as_str()).unwrap_or(&text)),
        None => text,
    }
}

fn label_matches(label: &str, candidates: &[&str]) -> bool {
    let l = normalize_text(label).to_lowercase();
    candidates.iter().any(|c| {
        let cc = c.to_lowercase();
        l.contains(&cc) || cc.contains(&l)
    })
}

fn nested_list_texts(li_inner: &str) -> Vec<String> {
    elements(li_inner, "ul")
        .into_iter()
        .flat_map(|ul| elements(ul.inner, "li"))
        .map(|li| text_content(li.inner))
        .filter(|t| !t.is_empty())
        .collect()
}

fn collect_charts(fragment: &str, charts: &mut Vec<RawChart>) {
    for ul in elements(fragment, "ul") {
        for li in elements(ul.inner, "li") {
            let own = remove_elements(li.inner, &["ul"]);
            for caps in IMG_RE.captures_iter(&own) {
                let Some(src) = caps.get(1).and_then(|m| attr(m.as_str(), "src")) else {
                    continue;
                };
                if src.contains("mongraph") {
                    charts.push(RawChart {
                        src: absolute_url(&src),
                        title: text_content(&own),
                    });
                }
            }
            collect_charts(li.inner, charts);
        }
    }
}

/// Scrape a node detail page (`.panel.panel-info .panel-body`).
///
/// Labels are matched in English and Chinese; when the list has at least
/// five entries, private IP / uptime / heartbeat are also read positionally
/// from items 2, 3 and 4 so unknown label languages still resolve.
pub fn parse_detail_page(html: &str) -> Result<RawDetail, Error> {
    let panel = find_element(html, "div", |attrs| {
        has_class(attrs, "panel") && has_class(attrs, "panel-info")
    })
    .and_then(|panel| find_element(panel.inner, "div", |attrs| has_class(attrs, "panel-body")))
    .ok_or_else(|| Error::UnexpectedShape("server status panel not found".into()))?;

    let items: Vec<Element<'_>> = elements(panel.inner, "ul")
        .into_iter()
        .flat_map(|ul| elements(ul.inner, "li"))
        .collect();

    let mut detail = RawDetail::default();

    if let [_, _, private_ip, uptime, heartbeat, ..] = items.as_slice() {
        detail.private_ip = item_value(private_ip.inner);
        detail.uptime = item_value(uptime.inner);
        detail.heartbeat = item_value(heartbeat.inner);
    }

    for item in &items {
        let label = item_label(item.inner);
        if label.is_empty() {
            continue;
        }
        if label_matches(&label, &["uptime", "運行時間"]) {
            detail.uptime = item_value(item.inner);
        } else if label_matches(&label, &["heartbeat", "心跳"]) {
            detail.heartbeat = item_value(item.inner);
        } else if label_matches(&label, &["private ip", "內部地址"]) {
            detail.private_ip = item_value(item.inner);
        } else if label_matches(&label, &["price policy", "價格政策"]) {
            let lines = nested_list_texts(item.inner);
            if !lines.is_empty() {
                detail.price_policy = lines;
            }
        }
    }

    if detail.uptime.is_empty() {
        let found = items.iter().find(|li| UPTIME_RE.is_match(&text_content(li.inner)));
        if let Some(li) = found {
            let raw = find_element(li.inner, "span", |attrs| has_class(attrs, "badge"))
                .map_or_else(|| text_content(li.inner), |badge| text_content(badge.inner));
            detail.uptime = normalize_text(&UPTIME_PREFIX_RE.replace(&raw, ""));
        }
    }

    if detail.private_ip.is_empty() {
        let found = items.iter().find(|li| PRIVATE_IP_RE.is_match(&text_content(li.inner)));
        if let Some(li) = found {
            let text = text_content(li.inner);
            detail.private_ip = normalize_text(&PRIVATE_IP_PREFIX_RE.replace(&text, ""));
        }
    }

    if detail.price_policy.is_empty() {
        detail.price_policy = items
            .iter()
            .flat_map(|li| nested_list_texts(li.inner))
            .filter(|t| !t.to_lowercase().ends_with(".png"))
            .collect();
    }

    collect_charts(panel.inner, &mut detail.charts);
    Ok(detail)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STATUS_PAGE: &str = r#"
        <html><body>
        <table id="staticnodes_table" class="table">
          <thead><tr><th>Location</th><th>Host</th><th>Load</th><th>Traffic</th><th>Congestion</th></tr></thead>
          <tbody>
            <tr>
              <td>Seoul (Google)</td>
              <td onClick="openStatusWindow(1)">node-kr-1</td>
              <td>0 / <b>0</b> / 0</td>
              <td>5</td>
              <td>0</td>
            </tr>
            <tr>
              <td>Tokyo (Vultr)</td>
              <td onclick="openStatusWindow(2)">node-jp-2</td>
              <td>12.5 / 1 / -</td>
              <td>1,024 MB</td>
              <td>&nbsp;3&nbsp;</td>
            </tr>
            <tr><td>broken</td><td>row</td></tr>
            <tr>
              <td>Nowhere</td><td>no handler</td><td>1/1/1</td><td>1</td><td>1</td>
            </tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn status_table_rows_are_extracted() {
        let rows = parse_status_table(STATUS_PAGE).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sid, "1");
        assert_eq!(rows[0].system_load, "0/0/0");
        assert_eq!(rows[0].traffic, "5");
        assert_eq!(rows[1].sid, "2");
        assert_eq!(rows[1].system_load, "12.5/1/-");
        assert_eq!(rows[1].traffic, "1,024 MB");
        assert_eq!(rows[1].congestion, "3");
    }

    #[test]
    fn missing_status_table_is_rejected() {
        let err = parse_status_table("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape(_)));
    }

    #[test]
    fn empty_table_yields_no_rows() {
        let rows = parse_status_table(r#"<table id="staticnodes_table"><tbody></tbody></table>"#).unwrap();
        assert!(rows.is_empty());
    }

    const DETAIL_PAGE: &str = r#"
        <div class="container">
          <div class="panel panel-info">
            <div class="panel-heading">Server Status</div>
            <div class="panel-body">
              <ul>
                <li><strong>Hostname</strong>: node-kr-1</li>
                <li><strong>IPv4</strong>: 1.1.1.1</li>
                <li><strong>Private IP</strong>: 10.0.0.5</li>
                <li><strong>Uptime</strong>: <span class="badge">12 days</span></li>
                <li><strong>Heartbeat</strong>: 2024-01-01 10:00:00</li>
                <li><strong>Price Policy</strong>
                  <ul>
                    <li>Tier 1: $0.10 / GB</li>
                    <li>Tier 2: $0.05 / GB</li>
                  </ul>
                </li>
                <li>System load <img src="//static.example.net/mongraph/12_system.png"></li>
                <li>Traffic <img src="https://static.example.net/mongraph/3_eth0.png"></li>
                <li>Logo <img src="/img/logo.png"></li>
              </ul>
            </div>
          </div>
        </div>
    "#;

    #[test]
    fn detail_page_fields_by_label() {
        let detail = parse_detail_page(DETAIL_PAGE).unwrap();
        assert_eq!(detail.private_ip, "10.0.0.5");
        assert_eq!(detail.uptime, "12 days");
        assert_eq!(detail.heartbeat, "2024-01-01 10:00:00");
        assert_eq!(detail.price_policy, vec!["Tier 1: $0.10 / GB", "Tier 2: $0.05 / GB"]);
    }

    #[test]
    fn detail_page_charts_are_absolute() {
        let detail = parse_detail_page(DETAIL_PAGE).unwrap();
        assert_eq!(detail.charts.len(), 2);
        assert_eq!(detail.charts[0].src, "https://static.example.net/mongraph/12_system.png");
        assert_eq!(detail.charts[0].title, "System load");
        assert_eq!(detail.charts[1].src, "https://static.example.net/mongraph/3_eth0.png");
    }

    #[test]
    fn detail_page_positional_fallback_for_unknown_labels() {
        let page = r#"
            <div class="panel panel-info"><div class="panel-body"><ul>
              <li><b>Hôte</b>: n</li>
              <li><b>Adresse</b>: 1.1.1.1</li>
              <li><b>Interne</b>: 10.1.1.1</li>
              <li><b>Durée</b>: 3 jours</li>
              <li><b>Pouls</b>: maintenant</li>
            </ul></div></div>
        "#;
        let detail = parse_detail_page(page).unwrap();
        assert_eq!(detail.private_ip, "10.1.1.1");
        assert_eq!(detail.uptime, "3 jours");
        assert_eq!(detail.heartbeat, "maintenant");
        assert!(detail.price_policy.is_empty());
    }

    #[test]
    fn detail_page_without_panel_is_rejected() {
        let err = parse_detail_page("<div class=\"panel\">nope</div>").unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape(_)));
    }

    #[test]
    fn nested_elements_belong_to_their_parent() {
        let html = "<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>";
        let outer = elements(html, "ul");
        assert_eq!(outer.len(), 1);
        let items = elements(outer[0].inner, "li");
        assert_eq!(items.len(), 2);
        assert_eq!(text_content(&remove_elements(items[0].inner, &["ul"])), "a");
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(text_content("a&amp;b&nbsp;&#67;&#x44;"), "a&b CD");
    }
}
