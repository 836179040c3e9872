/// Synthesis parameters taken from the client's upgrade request query
/// string. Fixed for the lifetime of the session; they define the upstream
/// connection URL and are never renegotiated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyParams {
    pub model: String,
    pub encoding: String,
    pub sample_rate: String,
    pub container: String,
}

impl Default for ProxyParams {
    fn default() -> Self {
        Self {
            model: "aura-asteria-en".to_string(),
            encoding: "linear16".to_string(),
            sample_rate: "24000".to_string(),
            container: "none".to_string(),
        }
    }
}

impl ProxyParams {
    /// Parses `key=value` pairs from an upgrade request query string.
    /// Unknown keys and empty values are ignored; missing keys keep their
    /// defaults.
    #[must_use]
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(query) = query else {
            return params;
        };
        for pair in query.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            match key {
                "model" => params.model = value.to_string(),
                "encoding" => params.encoding = value.to_string(),
                "sample_rate" => params.sample_rate = value.to_string(),
                "container" => params.container = value.to_string(),
                _ => {}
            }
        }
        params
    }

    /// Renders the query string for the upstream speak endpoint.
    #[must_use]
    pub fn as_query(&self) -> String {
        format!(
            "model={}&encoding={}&sample_rate={}&container={}",
            self.model, self.encoding, self.sample_rate, self.container
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_query_absent() {
        let params = ProxyParams::from_query(None);
        assert_eq!(params, ProxyParams::default());
        assert_eq!(params.model, "aura-asteria-en");
        assert_eq!(params.sample_rate, "24000");
    }

    #[test]
    fn overrides_from_query() {
        let params = ProxyParams::from_query(Some("model=aura-luna-en&sample_rate=48000"));
        assert_eq!(params.model, "aura-luna-en");
        assert_eq!(params.sample_rate, "48000");
        assert_eq!(params.encoding, "linear16");
        assert_eq!(params.container, "none");
    }

    #[test]
    fn ignores_unknown_keys_and_empty_values() {
        let params = ProxyParams::from_query(Some("voice=deep&model=&container=wav"));
        assert_eq!(params.model, "aura-asteria-en");
        assert_eq!(params.container, "wav");
    }

    #[test]
    fn renders_query_in_fixed_order() {
        let params = ProxyParams::from_query(Some("model=aura-luna-en"));
        assert_eq!(
            params.as_query(),
            "model=aura-luna-en&encoding=linear16&sample_rate=24000&container=none"
        );
    }
}
