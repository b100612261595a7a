use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetlabError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("NetLab API error {code}: {message}")]
    Api { code: i32, message: String },

    #[error("malformed response for {context}: {source}")]
    Xml {
        context: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("missing element <{element}> in {context}")]
    MissingElement {
        element: &'static str,
        context: String,
    },

    #[error("unparseable value \"{value}\" for {context}")]
    InvalidValue { context: String, value: String },

    #[error("invalid base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
