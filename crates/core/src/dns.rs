//! DNS over UDP: the TXT-query transport used by clients and the server loop.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::TXT;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::client::Transport;
use crate::config::ClientConfig;
use crate::dispatch::{Dispatcher, Question, QuestionType, Reply};
use crate::error::{Error, Result};

/// Largest single TXT character-string.
const TXT_CHUNK: usize = 255;
/// Plain DNS UDP payload limit without EDNS.
const UDP_MIN: usize = 512;
const UDP_MAX: u16 = 4096;

pub struct DnsTransport {
    config: ClientConfig,
}

impl DnsTransport {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    async fn exchange_with(&self, server: SocketAddr, request: &[u8], id: u16) -> Result<Message> {
        let local: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(server).await?;
        socket.send(request).await?;

        tokio::time::timeout(self.config.timeout, recv_reply(&socket, server, id))
            .await
            .map_err(|_| Error::Transport(format!("{server} timed out")))?
    }
}

async fn recv_reply(socket: &UdpSocket, server: SocketAddr, id: u16) -> Result<Message> {
    let mut buf = vec![0u8; usize::from(u16::MAX)];
    loop {
        let len = socket.recv(&mut buf).await?;
        match Message::from_vec(&buf[..len]) {
            Ok(msg) if msg.id() == id && msg.message_type() == MessageType::Response => {
                return Ok(msg)
            }
            Ok(msg) => debug!(%server, id = msg.id(), "ignoring unrelated response"),
            Err(e) => debug!(%server, "ignoring undecodable response: {e}"),
        }
    }
}

#[async_trait]
impl Transport for DnsTransport {
    async fn exchange(&self, name: &str) -> Result<Reply> {
        let id: u16 = rand::random();
        let mut request = Message::new();
        request
            .set_id(id)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true);
        request.add_query(Query::query(
            Name::from_ascii(format!("{}.", name))?,
            RecordType::TXT,
        ));
        let mut edns = Edns::new();
        edns.set_max_payload(UDP_MAX);
        request.set_edns(edns);
        let bytes = request.to_vec()?;

        let mut last = Error::Transport("no resolvers configured".into());
        for server in &self.config.resolvers {
            match self.exchange_with(*server, &bytes, id).await {
                Ok(response) => return reply_from(name, &response),
                Err(e) => {
                    warn!(%server, %name, "resolver failed: {e}");
                    last = e;
                }
            }
        }
        Err(last)
    }
}

fn reply_from(name: &str, response: &Message) -> Result<Reply> {
    match response.response_code() {
        ResponseCode::NoError => {}
        ResponseCode::NXDomain => return Ok(Reply::default()),
        code => return Err(Error::ResponseCode(code.to_string())),
    }
    if response.truncated() {
        return Err(Error::Transport(format!("truncated response for {name}")));
    }
    Ok(Reply {
        primary: response.answers().iter().find_map(text_of),
        supplementary: response.additionals().iter().filter_map(text_of).collect(),
    })
}

fn text_of(record: &Record) -> Option<Vec<u8>> {
    match record.data() {
        Some(RData::TXT(txt)) => Some(txt.txt_data().concat()),
        _ => None,
    }
}

/// One TXT record holding `text`, split into 255-byte character-strings.
fn txt_record(name: &Name, text: &[u8]) -> Record {
    let chunks: Vec<&[u8]> = if text.is_empty() {
        vec![&b""[..]]
    } else {
        text.chunks(TXT_CHUNK).collect()
    };
    let mut record = Record::from_rdata(name.clone(), 0, RData::TXT(TXT::from_bytes(chunks)));
    record.set_dns_class(DNSClass::IN);
    record
}

/// Binds `listen` and answers queries until the socket fails.
///
/// Errors a peer can provoke, such as an ICMP unreachable reported on the
/// next receive, are logged and skipped.
pub async fn serve(listen: SocketAddr, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let socket = Arc::new(UdpSocket::bind(listen).await?);
    info!(
        addr = %socket.local_addr()?,
        base = %dispatcher.config().base_name,
        "serving"
    );
    serve_socket(socket, dispatcher).await
}

/// Answer loop over an already bound socket; one task per datagram.
pub async fn serve_socket(socket: Arc<UdpSocket>, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let mut buf = vec![0u8; usize::from(UDP_MAX)];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) if is_transient(&e) => {
                warn!("receive failed: {e}");
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let packet = buf[..len].to_vec();
        let socket = socket.clone();
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            match respond(&dispatcher, &packet) {
                Ok(Some(bytes)) => {
                    if let Err(e) = socket.send_to(&bytes, peer).await {
                        warn!(%peer, "send failed: {e}");
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(%peer, "dropping malformed query: {e}"),
            }
        });
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

/// Encoded response to `packet`, or `None` if it is not a query.
pub fn respond(dispatcher: &Dispatcher, packet: &[u8]) -> Result<Option<Vec<u8>>> {
    let request = Message::from_vec(packet)?;
    if request.message_type() != MessageType::Query {
        return Ok(None);
    }

    let questions: Vec<Question> = request
        .queries()
        .iter()
        .map(|q| Question {
            name: q.name().to_ascii().trim_end_matches('.').to_string(),
            qtype: if q.query_type() == RecordType::TXT {
                QuestionType::Txt
            } else {
                QuestionType::Other
            },
        })
        .collect();
    let reply = dispatcher.answer(&questions);

    let limit = request
        .extensions()
        .as_ref()
        .map(|e| usize::from(e.max_payload()).max(UDP_MIN))
        .unwrap_or(UDP_MIN);

    let bytes = build_response(&request, &reply).to_vec()?;
    if bytes.len() <= limit {
        return Ok(Some(bytes));
    }

    // Clients fall back to one query per page when supplementary records are missing.
    let trimmed = Reply {
        primary: reply.primary,
        supplementary: Vec::new(),
    };
    if !trimmed.is_not_found() {
        let bytes = build_response(&request, &trimmed).to_vec()?;
        if bytes.len() <= limit {
            return Ok(Some(bytes));
        }
    }

    let mut truncated = build_response(&request, &Reply::default());
    truncated
        .set_response_code(ResponseCode::NoError)
        .set_truncated(true);
    Ok(Some(truncated.to_vec()?))
}

fn build_response(request: &Message, reply: &Reply) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_authoritative(true);
    for query in request.queries() {
        response.add_query(query.clone());
    }
    if request.extensions().is_some() {
        let mut edns = Edns::new();
        edns.set_max_payload(UDP_MAX);
        response.set_edns(edns);
    }

    match request.queries().first() {
        Some(query) if !reply.is_not_found() => {
            if let Some(text) = &reply.primary {
                response.add_answer(txt_record(query.name(), text));
            }
            for text in &reply.supplementary {
                response.add_additional(txt_record(query.name(), text));
            }
            response.set_response_code(ResponseCode::NoError);
        }
        _ => {
            response.set_response_code(ResponseCode::NXDomain);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(name: &str, rtype: RecordType) -> Vec<u8> {
        let mut m = Message::new();
        m.set_id(42).set_message_type(MessageType::Query);
        m.add_query(Query::query(Name::from_ascii(name).unwrap(), rtype));
        m.to_vec().unwrap()
    }

    fn dispatcher() -> (tempfile::TempDir, Dispatcher) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), "x".repeat(300)).unwrap();
        let tree = Arc::new(crate::tree::VirtualTree::build(dir.path()).unwrap());
        let d = Dispatcher::new(tree, crate::config::ServerConfig::with_base_name("svc.example"))
            .unwrap();
        (dir, d)
    }

    #[test]
    fn long_text_survives_chunking() {
        let name = Name::from_ascii("a.example.").unwrap();
        let text = "y".repeat(600);
        let record = txt_record(&name, text.as_bytes());
        assert_eq!(text_of(&record).unwrap(), text.as_bytes());
        assert!(text_of(&txt_record(&name, b"")).unwrap().is_empty());
    }

    #[test]
    fn non_utf8_text_is_kept() {
        let name = Name::from_ascii("a.example.").unwrap();
        let mut text = b"00 caf\xe9".to_vec();
        text.extend(std::iter::repeat(0xffu8).take(300));
        assert_eq!(text_of(&txt_record(&name, &text)).unwrap(), text);
    }

    #[test]
    fn peer_errors_do_not_stop_the_loop() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::NotConnected)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[test]
    fn server_info_response_is_stamped() {
        let (_dir, d) = dispatcher();
        let bytes = respond(&d, &query("svc.example.", RecordType::TXT))
            .unwrap()
            .unwrap();
        let msg = Message::from_vec(&bytes).unwrap();
        assert_eq!(msg.id(), 42);
        assert_eq!(msg.response_code(), ResponseCode::NoError);
        let answer = &msg.answers()[0];
        assert_eq!(answer.name().to_ascii(), "svc.example.");
        assert_eq!(answer.record_type(), RecordType::TXT);
        assert_eq!(answer.dns_class(), DNSClass::IN);
        let reply = reply_from("svc.example", &msg).unwrap();
        assert_eq!(
            reply.primary.as_deref(),
            Some(&b"SRV svc.example;FEAT FOLDER,HREF,TXT"[..])
        );
    }

    #[test]
    fn item_longer_than_one_string() {
        let (_dir, d) = dispatcher();
        let name = format!("{}.svc.example.", crate::identity::label_of("big.txt"));
        let bytes = respond(&d, &query(&name, RecordType::TXT)).unwrap().unwrap();
        let msg = Message::from_vec(&bytes).unwrap();
        let reply = reply_from(&name, &msg).unwrap();
        assert_eq!(reply.primary.unwrap(), format!("00 {}", "x".repeat(300)).into_bytes());
    }

    #[test]
    fn unknown_and_wrong_type_are_nxdomain() {
        let (_dir, d) = dispatcher();
        for packet in [
            query("nope.other.", RecordType::TXT),
            query("svc.example.", RecordType::A),
        ] {
            let bytes = respond(&d, &packet).unwrap().unwrap();
            let msg = Message::from_vec(&bytes).unwrap();
            assert_eq!(msg.response_code(), ResponseCode::NXDomain);
            assert!(msg.answers().is_empty());
            assert!(reply_from("x", &msg).unwrap().is_not_found());
        }
    }

    #[test]
    fn responses_are_ignored() {
        let (_dir, d) = dispatcher();
        let mut m = Message::new();
        m.set_id(1).set_message_type(MessageType::Response);
        assert!(respond(&d, &m.to_vec().unwrap()).unwrap().is_none());
    }
}
