//! Gateway addressing and the connection handshake

use url::form_urlencoded;
use url::Url;

use crate::error::{TunnelError, TunnelResult};

/// DPI hint sent in every handshake
///
/// Deliberately fixed: reporting the device DPI breaks resolution on
/// high-density displays, omitting it makes the gateway ignore the size.
pub const SCREEN_DPI: u32 = 96;

/// The gateway serving the RAC tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEndpoint {
    host: String,
    secure: bool,
}

impl GatewayEndpoint {
    /// Creates an endpoint for `host` (with optional `:port`)
    pub fn new(host: impl Into<String>, secure: bool) -> Self {
        Self {
            host: host.into(),
            secure,
        }
    }

    /// Derives the endpoint from a page origin such as `https://rac.example.com`
    ///
    /// The tunnel mirrors the origin's security level: `http` maps to `ws`,
    /// `https` to `wss`.
    pub fn from_origin(origin: &str) -> TunnelResult<Self> {
        let url = Url::parse(origin)?;
        let secure = match url.scheme() {
            "https" | "wss" => true,
            "http" | "ws" => false,
            other => {
                return Err(TunnelError::InvalidEndpoint(format!(
                    "unsupported scheme: {}",
                    other
                )))
            }
        };

        let host = url
            .host_str()
            .ok_or_else(|| TunnelError::InvalidEndpoint(format!("missing host: {}", origin)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self { host, secure })
    }

    /// Returns the WebSocket scheme
    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "wss"
        } else {
            "ws"
        }
    }

    /// Returns the host (and port)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Builds `{ws|wss}://{host}/ws/rac/{token}/`
    pub fn tunnel_url(&self, token: &str) -> TunnelResult<Url> {
        if token.is_empty() {
            return Err(TunnelError::InvalidEndpoint("empty token".to_string()));
        }

        let mut url = Url::parse(&format!("{}://{}/", self.scheme(), self.host))?;
        url.path_segments_mut()
            .map_err(|_| TunnelError::InvalidEndpoint(self.host.clone()))?
            .clear()
            .extend(["ws", "rac", token, ""]);

        Ok(url)
    }
}

/// Initial handshake parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeParams {
    /// Desired display width in pixels
    pub width: u32,
    /// Desired display height in pixels
    pub height: u32,
    /// DPI hint
    pub dpi: u32,
}

impl HandshakeParams {
    /// Creates parameters for a display of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            dpi: SCREEN_DPI,
        }
    }

    /// Encodes the parameters as an urlencoded query string
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("screen_width", &self.width.to_string())
            .append_pair("screen_height", &self.height.to_string())
            .append_pair("screen_dpi", &self.dpi.to_string())
            .finish()
    }
}
