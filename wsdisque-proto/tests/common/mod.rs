//! In-process fake Disque node for integration tests.
//!
//! Speaks just enough RESP for ADDJOB, GETJOB and FASTACK. GETJOB never
//! blocks: an empty queue answers with a null array as if NOHANG was given.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use wsdisque_core::endpoint::BrokerEndpoint;
use wsdisque_core::options::LinkOptions;

#[derive(Default)]
struct State {
    queues: HashMap<String, VecDeque<(String, Vec<u8>)>>,
    acked: Vec<String>,
    commands: Vec<Vec<Vec<u8>>>,
    next_id: u64,
}

#[derive(Clone)]
pub struct FakeDisque {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl FakeDisque {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(State::default()));

        let shared = state.clone();
        thread::spawn(move || {
            for conn in listener.incoming() {
                let Ok(conn) = conn else { break };
                let shared = shared.clone();
                thread::spawn(move || {
                    let _ = serve(conn, &shared);
                });
            }
        });

        Self { addr, state }
    }

    pub fn endpoint(&self) -> BrokerEndpoint {
        BrokerEndpoint::new("127.0.0.1", self.addr.port())
    }

    /// Enqueue a job directly, bypassing ADDJOB.
    pub fn push_job(&self, queue: &str, body: &[u8]) -> String {
        let mut state = self.state.lock();
        let id = next_id(&mut state);
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back((id.clone(), body.to_vec()));
        id
    }

    pub fn acked(&self) -> Vec<String> {
        self.state.lock().acked.clone()
    }

    pub fn queued(&self, queue: &str) -> usize {
        self.state.lock().queues.get(queue).map_or(0, VecDeque::len)
    }

    /// Names of every command received so far.
    pub fn command_names(&self) -> Vec<String> {
        self.state
            .lock()
            .commands
            .iter()
            .map(|c| String::from_utf8_lossy(&c[0]).into_owned())
            .collect()
    }
}

/// Options that give the fake node time to answer before "available" is sampled.
pub fn link_options() -> LinkOptions {
    LinkOptions::default()
        .with_reply_wait(Duration::from_secs(2))
        .with_body_grace(Duration::from_secs(2))
}

/// An endpoint whose listener accepts and immediately hangs up.
pub fn hang_up_endpoint() -> BrokerEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for conn in listener.incoming() {
            drop(conn);
        }
    });
    BrokerEndpoint::new("127.0.0.1", port)
}

/// An endpoint nothing listens on.
pub fn closed_endpoint() -> BrokerEndpoint {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    BrokerEndpoint::new("127.0.0.1", port)
}

fn next_id(state: &mut State) -> String {
    state.next_id += 1;
    format!("D-{:08x}-fake", state.next_id)
}

fn serve(conn: TcpStream, state: &Mutex<State>) -> io::Result<()> {
    let mut writer = conn.try_clone()?;
    let mut reader = BufReader::new(conn);
    while let Some(args) = read_request(&mut reader)? {
        let reply = handle(&args, &mut state.lock());
        writer.write_all(&reply)?;
        writer.flush()?;
    }
    Ok(())
}

fn read_request(reader: &mut impl BufRead) -> io::Result<Option<Vec<Vec<u8>>>> {
    let mut header = String::new();
    if reader.read_line(&mut header)? == 0 {
        return Ok(None);
    }
    let count: usize = header.trim_start_matches('*').trim().parse().map_err(invalid)?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let mut len_line = String::new();
        reader.read_line(&mut len_line)?;
        let len: usize = len_line.trim_start_matches('$').trim().parse().map_err(invalid)?;
        let mut body = vec![0u8; len + 2];
        reader.read_exact(&mut body)?;
        body.truncate(len);
        args.push(body);
    }
    Ok(Some(args))
}

fn invalid(e: std::num::ParseIntError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

fn handle(args: &[Vec<u8>], state: &mut State) -> Vec<u8> {
    state.commands.push(args.to_vec());
    let name = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
    match name.as_str() {
        "ADDJOB" if args.len() >= 4 => {
            let queue = String::from_utf8_lossy(&args[1]).into_owned();
            let id = next_id(state);
            state
                .queues
                .entry(queue)
                .or_default()
                .push_back((id.clone(), args[2].clone()));
            format!("+{id}\r\n").into_bytes()
        }
        "GETJOB" => getjob(&args[1..], state),
        "FASTACK" => {
            let ids: Vec<String> = args[1..]
                .iter()
                .map(|a| String::from_utf8_lossy(a).into_owned())
                .collect();
            let n = ids.len();
            state.acked.extend(ids);
            format!(":{n}\r\n").into_bytes()
        }
        _ => b"-ERR unknown command\r\n".to_vec(),
    }
}

fn getjob(options: &[Vec<u8>], state: &mut State) -> Vec<u8> {
    let mut count = 1usize;
    let mut queues = Vec::new();
    let mut i = 0;
    while i < options.len() {
        match String::from_utf8_lossy(&options[i]).to_ascii_lowercase().as_str() {
            "count" => {
                count = String::from_utf8_lossy(&options[i + 1]).parse().unwrap_or(1);
                i += 2;
            }
            "timeout" => i += 2,
            "nohang" | "withcounters" => i += 1,
            "from" => {
                queues = options[i + 1..]
                    .iter()
                    .map(|q| String::from_utf8_lossy(q).into_owned())
                    .collect();
                break;
            }
            _ => return b"-ERR syntax error\r\n".to_vec(),
        }
    }

    let mut jobs = Vec::new();
    for queue in &queues {
        while jobs.len() < count {
            match state.queues.get_mut(queue).and_then(VecDeque::pop_front) {
                Some((id, body)) => jobs.push((queue.clone(), id, body)),
                None => break,
            }
        }
    }

    if jobs.is_empty() {
        return b"*-1\r\n".to_vec();
    }
    let mut out = format!("*{}\r\n", jobs.len()).into_bytes();
    for (queue, id, body) in jobs {
        out.extend_from_slice(b"*3\r\n");
        for field in [queue.as_bytes(), id.as_bytes(), &body[..]] {
            out.extend_from_slice(format!("${}\r\n", field.len()).as_bytes());
            out.extend_from_slice(field);
            out.extend_from_slice(b"\r\n");
        }
    }
    out
}
