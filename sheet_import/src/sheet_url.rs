//! Rewrites spreadsheet links into direct CSV download links.

use url::{form_urlencoded, Url};

const EDIT_SEGMENT: &str = "edit";
const EXPORT_SEGMENT: &str = "export";
const TAB_PARAM: &str = "gid";

/// Turns an editable sheet link into its CSV export link.
///
/// The `edit` path segment (and anything after it) becomes `export?format=csv`, and a tab selector
/// found in the fragment or query (`#gid=123`) is carried over as a query parameter.
/// Anything that isn't an edit link is returned unchanged.
///
/// # Examples
///
/// ```
/// let url = sheet_import::sheet_url::to_export_url("https://docs.google.com/spreadsheets/d/abc/edit#gid=42");
/// assert_eq!(url, "https://docs.google.com/spreadsheets/d/abc/export?format=csv&gid=42");
/// ```
#[must_use]
pub fn to_export_url(sheet_url: &str) -> String {
    let sheet_url = sheet_url.trim();
    let Ok(mut url) = Url::parse(sheet_url) else {
        return sheet_url.to_owned();
    };

    let Some(segments) = url.path_segments() else {
        return sheet_url.to_owned();
    };

    let segments: Vec<String> = segments.map(str::to_owned).collect();
    let Some(edit_at) = segments.iter().position(|s| s == EDIT_SEGMENT) else {
        return sheet_url.to_owned();
    };

    let tab = find_tab(url.fragment()).or_else(|| find_tab(url.query()));

    if let Ok(mut path) = url.path_segments_mut() {
        path.clear()
            .extend(&segments[..edit_at])
            .push(EXPORT_SEGMENT);
    }

    {
        let mut query = url.query_pairs_mut();
        query.clear().append_pair("format", "csv");
        if let Some(tab) = &tab {
            query.append_pair(TAB_PARAM, tab);
        }
    }

    url.set_fragment(None);
    url.into()
}

fn find_tab(part: Option<&str>) -> Option<String> {
    form_urlencoded::parse(part?.as_bytes())
        .find(|(key, _)| key == TAB_PARAM)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod test {
    use super::to_export_url;

    #[test]
    fn fragment_tab_becomes_query() {
        assert_eq!(
            to_export_url("https://docs.google.com/spreadsheets/d/1AbC-xyz/edit#gid=123456"),
            "https://docs.google.com/spreadsheets/d/1AbC-xyz/export?format=csv&gid=123456"
        );
    }

    #[test]
    fn sharing_query_is_dropped() {
        assert_eq!(
            to_export_url("https://docs.google.com/spreadsheets/d/1AbC/edit?usp=sharing"),
            "https://docs.google.com/spreadsheets/d/1AbC/export?format=csv"
        );
        assert_eq!(
            to_export_url("https://docs.google.com/spreadsheets/d/1AbC/edit?gid=7#gid=7"),
            "https://docs.google.com/spreadsheets/d/1AbC/export?format=csv&gid=7"
        );
    }

    #[test]
    fn fragment_with_range() {
        assert_eq!(
            to_export_url("https://docs.google.com/spreadsheets/d/1AbC/edit#gid=5&range=A1:B2"),
            "https://docs.google.com/spreadsheets/d/1AbC/export?format=csv&gid=5"
        );
    }

    #[test]
    fn other_links_are_unchanged() {
        let export = "https://docs.google.com/spreadsheets/d/1AbC/export?format=csv&gid=0";
        assert_eq!(to_export_url(export), export);
        assert_eq!(to_export_url("https://example.com/data.csv"), "https://example.com/data.csv");
        assert_eq!(to_export_url(" not a url "), "not a url");
    }
}
