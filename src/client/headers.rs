use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER,
};

/// Build headers for AJAX calls against the reservation backend
///
/// Mirrors what the site's own scripts send: `X-Requested-With`, a
/// JSON-first `Accept`, and same-origin `Origin`/`Referer`. Values that are
/// not valid header text are skipped.
///
/// # Examples
///
/// ```
/// use burstbook::client::headers::build_ajax_headers;
///
/// let headers = build_ajax_headers(
///     "http://booking.example",
///     "http://booking.example/alumni/presuniv_events",
/// );
/// assert!(headers.contains_key("x-requested-with"));
/// ```
pub fn build_ajax_headers(origin: &str, referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7"),
    );

    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(ORIGIN, value);
    }
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }

    headers
}

/// Build headers for plain page loads (login page)
pub fn build_page_headers(origin: &str, referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7"),
    );

    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(ORIGIN, value);
    }
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }

    headers
}
