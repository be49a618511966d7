//! `zoom/lat/lon` view descriptor parsing.

/// A numeric view descriptor embedded in the page's addressable
/// location state, e.g. `#12.5/47.37/8.54`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewDescriptor {
    pub zoom: f64,
    pub lat: f64,
    pub lon: f64,
}

impl ViewDescriptor {
    /// Parse a `zoom/lat/lon` fragment, with or without a leading `#`.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim().trim_start_matches('#');
        let mut parts = trimmed.split('/');

        let zoom: f64 = parts.next()?.parse().ok()?;
        let lat: f64 = parts.next()?.parse().ok()?;
        let lon: f64 = parts.next()?.parse().ok()?;

        if !zoom.is_finite() || !lat.is_finite() || !lon.is_finite() || zoom < 0.0 {
            return None;
        }

        Some(Self { zoom, lat, lon })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_hash_prefixed() {
        let view = ViewDescriptor::parse("12.5/47.37/8.54").unwrap();
        assert_eq!(view.zoom, 12.5);
        assert_eq!(view.lat, 47.37);
        assert_eq!(view.lon, 8.54);

        assert_eq!(ViewDescriptor::parse("#12.5/47.37/8.54"), Some(view));
        assert!(ViewDescriptor::parse("#3/-33.86/151.21").is_some());
    }

    #[test]
    fn rejects_malformed_descriptors() {
        assert!(ViewDescriptor::parse("").is_none());
        assert!(ViewDescriptor::parse("12.5/47.37").is_none());
        assert!(ViewDescriptor::parse("abc/47.37/8.54").is_none());
        assert!(ViewDescriptor::parse("-2/47.37/8.54").is_none());
        assert!(ViewDescriptor::parse("nan/1/2").is_none());
    }
}
