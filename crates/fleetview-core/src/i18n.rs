// ── Translation lookup ──
//
// User-facing labels only; parsing never goes through here.

use std::collections::HashMap;

/// `t(path, vars)` lookup for a locale.
pub trait Translator: Send + Sync {
    /// Label for `path` in `locale`. Unknown paths come back unchanged;
    /// `{name}` placeholders are filled from `vars`.
    fn t(&self, locale: &str, path: &str, vars: &[(&str, &str)]) -> String;
}

/// Static label table keyed by locale, falling back to English.
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: HashMap<String, HashMap<String, String>>,
}

const ENGLISH: &[(&str, &str)] = &[
    ("provider.all", "All Providers"),
    ("provider.filterLabel", "Provider"),
    ("search.label", "Search"),
    ("search.placeholder", "Hostname or IP"),
    ("country.all", "Country Prefix (All)"),
    ("country.selected", "Country Prefix (Selected {count})"),
    ("load.cpu", "CPU"),
    ("load.io", "IO"),
    ("load.nic", "Errors"),
    ("load.congestion", "Congestion"),
    ("load.any", "Any"),
    ("buttons.best", "Best Server"),
    ("buttons.reset", "Reset Filters"),
    ("table.headers.region", "Region"),
    ("table.headers.provider", "Provider"),
    ("table.headers.ip", "IPv4"),
    ("table.headers.id", "Node SID"),
    ("table.headers.cpuLoad", "CPU %"),
    ("table.headers.ioWait", "IO Wait %"),
    ("table.headers.nicError", "NIC Errors"),
    ("table.headers.network", "Traffic (MB)"),
    ("table.headers.congestion", "Congestion"),
    ("table.loading", "Loading…"),
    ("table.empty", "No matching nodes found."),
    ("errors.loadFailed", "Failed to fetch data. Please try again later."),
    ("metricImageLabels.systemLoad", "System Load Chart"),
    ("metricImageLabels.network", "Traffic Trend"),
    ("metricImageLabels.congestion", "Congestion Trend"),
    ("hover.labels.ipv4", "IPv4"),
    ("hover.labels.id", "Node SID"),
    ("hover.labels.privateIp", "Private IP"),
    ("hover.labels.uptime", "Uptime"),
    ("hover.labels.heartbeat", "Heartbeat"),
    ("hover.labels.pricePolicy", "Price Policy"),
    ("hover.labels.cpuLoad", "CPU %"),
    ("hover.labels.ioWait", "IO Wait %"),
    ("hover.labels.nicError", "NIC Errors"),
    ("hover.labels.network", "Traffic (MB)"),
    ("hover.labels.congestion", "Congestion"),
    ("hover.fetching", "Fetching details…"),
    ("hover.fetchTimePrefix", "Fetched at"),
    ("hover.fetchFailed", "Failed to fetch details"),
    ("hover.retryLater", "Please retry later or check your connection"),
    ("hover.noDetails", "No details available"),
    ("status.cached", "cached {age} ago"),
    ("status.live", "updated {age} ago"),
    ("status.count", "{shown} / {total} nodes"),
];

impl Default for Catalog {
    fn default() -> Self {
        Self::english()
    }
}

impl Catalog {
    pub fn english() -> Self {
        let mut tables = HashMap::new();
        tables.insert(
            "en".to_owned(),
            ENGLISH.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect(),
        );
        Self { tables }
    }

    /// Add or override labels for a locale.
    #[must_use]
    pub fn with_locale<I, K, V>(mut self, locale: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tables
            .entry(locale.to_owned())
            .or_default()
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    fn lookup(&self, locale: &str, path: &str) -> Option<&str> {
        self.tables
            .get(locale)
            .and_then(|t| t.get(path))
            .or_else(|| self.tables.get("en").and_then(|t| t.get(path)))
            .map(String::as_str)
    }
}

impl Translator for Catalog {
    fn t(&self, locale: &str, path: &str, vars: &[(&str, &str)]) -> String {
        let mut text = self.lookup(locale, path).unwrap_or(path).to_owned();
        for (name, value) in vars {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_english_then_path() {
        let catalog = Catalog::english().with_locale("ja", [("table.empty", "該当なし")]);
        assert_eq!(catalog.t("ja", "table.empty", &[]), "該当なし");
        assert_eq!(catalog.t("ja", "table.loading", &[]), "Loading…");
        assert_eq!(catalog.t("en", "no.such.label", &[]), "no.such.label");
        assert_eq!(catalog.locales(), vec!["en", "ja"]);
    }

    #[test]
    fn fills_placeholders() {
        let catalog = Catalog::english();
        assert_eq!(
            catalog.t("en", "country.selected", &[("count", "3")]),
            "Country Prefix (Selected 3)"
        );
    }
}
