//! UDP-Discovery des Charm-Servers
//!
//! Einmaliger Lauscher: bindet einen broadcast-faehigen UDP-Socket auf dem
//! Discovery-Port und wartet begrenzt auf genau ein Datagramm. Der Inhalt
//! wird nicht geprueft, nur die Absenderadresse zaehlt.
//!
//! Der Probe ist zustandslos. Wiederholungen sind Sache des Aufrufers.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use charm_protocol::Event;
use tokio::net::UdpSocket;

use crate::queue::EventSink;

/// Standard-Wartezeit auf ein Discovery-Paket
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Groesse des Empfangspuffers (Inhalt wird ignoriert)
const DISCOVERY_PUFFER: usize = 16;

/// Wartet auf ein Discovery-Paket und gibt den Hostnamen des Absenders zurueck
///
/// - Bind-Fehler: sofort `None`, ohne `DiscoveryStarted`
/// - Zeitlimit oder Empfangsfehler: `None`
/// - Erfolg: meldet `DiscoveryFound` und gibt den Hostnamen zurueck
///
/// Der Socket wird auf jedem Pfad geschlossen.
pub async fn discover(port: u16, timeout: Duration, events: &EventSink) -> Option<String> {
    let socket = match binden(port).await {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(port, fehler = %e, "Discovery-Socket konnte nicht gebunden werden");
            return None;
        }
    };

    events.melden(Event::DiscoveryStarted);
    tracing::debug!(port, timeout_ms = timeout.as_millis() as u64, "Suche Charm-Server");

    let mut buf = [0u8; DISCOVERY_PUFFER];
    match tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await {
        Ok(Ok((_, absender))) => {
            let host = absender_host(absender);
            tracing::info!(host = %host, "Charm-Server per Broadcast gefunden");
            events.melden(Event::DiscoveryFound { host: host.clone() });
            Some(host)
        }
        Ok(Err(e)) => {
            tracing::debug!(fehler = %e, "Discovery-Empfangsfehler");
            None
        }
        Err(_) => {
            tracing::debug!(port, "Kein Discovery-Paket innerhalb des Zeitlimits");
            None
        }
    }
}

async fn binden(port: u16) -> std::io::Result<UdpSocket> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    socket.set_broadcast(true)?;
    Ok(socket)
}

/// Textform der Absender-IP (keine Reverse-DNS-Aufloesung)
fn absender_host(absender: SocketAddr) -> String {
    absender.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::event_kanal;

    async fn freier_port() -> u16 {
        let sock = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        sock.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn findet_absender() {
        let port = freier_port().await;
        let (sink, mut rx) = event_kanal();

        let suche = tokio::spawn(async move {
            discover(port, Duration::from_secs(3), &sink).await
        });

        // Beacon wiederholt senden, bis der Probe gebunden hat
        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        while !suche.is_finished() {
            let _ = sender.send_to(b"charm", (Ipv4Addr::LOCALHOST, port)).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let host = suche.await.unwrap();
        assert_eq!(host.as_deref(), Some("127.0.0.1"));
        assert_eq!(rx.recv().await, Some(Event::DiscoveryStarted));
        assert_eq!(
            rx.recv().await,
            Some(Event::DiscoveryFound {
                host: "127.0.0.1".into()
            })
        );
    }

    #[tokio::test]
    async fn zeitlimit_ergibt_none() {
        let port = freier_port().await;
        let (sink, mut rx) = event_kanal();

        let host = discover(port, Duration::from_millis(100), &sink).await;
        assert!(host.is_none());
        assert_eq!(rx.recv().await, Some(Event::DiscoveryStarted));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn bind_fehler_ohne_discovery_event() {
        // Port belegen, damit der Probe nicht binden kann
        let belegt = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.unwrap();
        let port = belegt.local_addr().unwrap().port();
        let (sink, mut rx) = event_kanal();

        let host = discover(port, Duration::from_secs(3), &sink).await;
        assert!(host.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn hostname_ist_ip_text() {
        let addr: SocketAddr = "192.168.1.20:5323".parse().unwrap();
        assert_eq!(absender_host(addr), "192.168.1.20");
    }
}
