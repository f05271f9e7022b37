//! Transport encryption setup, built on `rustls`/`rustls-native-certs`/
//! `tokio-postgres-rustls`. `disable` skips TLS entirely (the connector still
//! needs to exist because `tokio_postgres::Config::connect` takes one, but
//! Postgres falls back to plaintext when the server doesn't request TLS and
//! `sslmode` isn't `require`).

use ix_config::TransportEncryption;
use rustls::{
    ClientConfig,
    RootCertStore,
};
use tokio_postgres_rustls::MakeRustlsConnect;

pub fn make_tls_connector(mode: TransportEncryption) -> anyhow::Result<MakeRustlsConnect> {
    let mut roots = RootCertStore::empty();
    for cert in rustls_native_certs::load_native_certs().certs {
        roots.add(cert)?;
    }
    let mut config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    if matches!(mode, TransportEncryption::Disable) {
        // Still build a valid rustls config; the caller is expected to have
        // configured the server to not require TLS. Postgres negotiates
        // transport per-connection, so there is no "off" switch on the
        // client config itself short of not offering TLS, which
        // `tokio_postgres` handles via `sslmode` on its own `Config`.
        config.enable_sni = false;
    }
    Ok(MakeRustlsConnect::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_connector_for_every_mode() {
        for mode in [
            TransportEncryption::Disable,
            TransportEncryption::Prefer,
            TransportEncryption::Require,
        ] {
            assert!(make_tls_connector(mode).is_ok());
        }
    }
}
