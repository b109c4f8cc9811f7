//! Background read pipeline.
//!
//! Two threads own the read half of the transport for the lifetime of the
//! connection:
//!
//! - the **reader** copies raw bytes off the transport into a channel;
//! - the **framer** reassembles them into packets and routes each one,
//!   reports to the report queue and everything else to the response queue.
//!
//! Both queues are bounded and fed with `try_send`, so a caller that stops
//! reading reports can never hold up response delivery (or the other way
//! round); overflow is logged and dropped. When the transport reaches end of
//! file or fails, the threads exit and close both queues.

use std::io::{self, ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cfa635_protocol::{Framer, Packet, Report};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

/// Raw chunks buffered between the reader and the framer.
const BYTE_QUEUE_DEPTH: usize = 64;
/// Responses buffered for the correlator; normally at most one is in flight.
pub(crate) const RESPONSE_QUEUE_DEPTH: usize = 4;
/// Largest single read from the transport.
const READ_CHUNK: usize = 64;

/// Pipeline tuning, taken from the connection config.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PipelineConfig {
    pub packet_timeout: Duration,
    pub report_queue_depth: usize,
}

/// Receiving ends handed to the [`Module`](crate::Module).
pub(crate) struct PipelineQueues {
    pub reports: Receiver<Report>,
    pub responses: Receiver<Packet>,
}

/// Handle to the running pipeline threads.
#[derive(Debug)]
pub(crate) struct Pipeline {
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    framer: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Start the reader and framer threads over `source`.
    pub fn spawn<R>(source: R, config: PipelineConfig) -> io::Result<(Pipeline, PipelineQueues)>
    where
        R: Read + Send + 'static,
    {
        let (bytes_tx, bytes_rx) = bounded::<Vec<u8>>(BYTE_QUEUE_DEPTH);
        let (reports_tx, reports_rx) = bounded::<Report>(config.report_queue_depth);
        let (responses_tx, responses_rx) = bounded::<Packet>(RESPONSE_QUEUE_DEPTH);
        let stop = Arc::new(AtomicBool::new(false));

        let reader_stop = stop.clone();
        let reader = thread::Builder::new()
            .name("cfa635-reader".into())
            .spawn(move || run_reader(source, bytes_tx, reader_stop))?;

        let framer_stop = stop.clone();
        let router = Router {
            reports: reports_tx,
            responses: responses_tx,
        };
        let framer = thread::Builder::new()
            .name("cfa635-framer".into())
            .spawn(move || run_framer(Framer::new(config.packet_timeout), bytes_rx, router, framer_stop))?;

        Ok((
            Pipeline {
                stop,
                reader: Some(reader),
                framer: Some(framer),
            },
            PipelineQueues {
                reports: reports_rx,
                responses: responses_rx,
            },
        ))
    }

    /// Ask both threads to exit.
    ///
    /// The reader only notices between reads, so a transport without a read
    /// timeout keeps it alive until the next byte or end of file.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Whether both threads have exited.
    pub fn is_finished(&self) -> bool {
        let done = |h: &Option<JoinHandle<()>>| h.as_ref().map_or(true, |h| h.is_finished());
        done(&self.reader) && done(&self.framer)
    }

    /// Wait for both threads to exit.
    pub fn join(&mut self) {
        for handle in [self.reader.take(), self.framer.take()].into_iter().flatten() {
            if handle.join().is_err() {
                log::error!("CFA635 pipeline thread panicked");
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Copy bytes from the transport into the byte queue until end of file, a
/// hard error, or shutdown.
fn run_reader<R: Read>(mut source: R, bytes: Sender<Vec<u8>>, stop: Arc<AtomicBool>) {
    let mut buf = [0u8; READ_CHUNK];
    while !stop.load(Ordering::Relaxed) {
        match source.read(&mut buf) {
            Ok(0) => {
                log::debug!("CFA635 transport closed");
                break;
            }
            Ok(n) => {
                log::trace!("read {} bytes: {:02X?}", n, &buf[..n]);
                if bytes.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                continue;
            }
            Err(e) => {
                log::error!("failed to read from CFA635: {}", e);
                break;
            }
        }
    }
}

/// Assemble packets from the byte queue and route them.
///
/// Waits indefinitely while idle between packets; once a packet has started
/// it waits only until the framer's deadline.
fn run_framer(mut framer: Framer, bytes: Receiver<Vec<u8>>, router: Router, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        let chunk = match framer.deadline() {
            None => match bytes.recv() {
                Ok(chunk) => chunk,
                Err(_) => break,
            },
            Some(deadline) => match bytes.recv_deadline(deadline) {
                Ok(chunk) => chunk,
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(err) = framer.expire(Instant::now()) {
                        log::warn!("failed to read packet from CFA635: {}", err);
                    }
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
        };

        for outcome in framer.push_slice(&chunk, Instant::now()) {
            match outcome {
                Ok(packet) => {
                    if !router.route(packet) {
                        return;
                    }
                }
                Err(err) => log::warn!("failed to read packet from CFA635: {}", err),
            }
        }
    }
}

/// Splits packets between the report and response queues.
pub(crate) struct Router {
    reports: Sender<Report>,
    responses: Sender<Packet>,
}

impl Router {
    /// Deliver one packet. Returns `false` once the owning module is gone.
    pub fn route(&self, packet: Packet) -> bool {
        if packet.is_report() {
            match Report::decode(&packet) {
                Ok(report) => {
                    log::debug!("report: {}", report);
                    match self.reports.try_send(report) {
                        Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                        Err(TrySendError::Full(report)) => {
                            log::warn!("report queue full, dropping {}", report);
                        }
                    }
                }
                Err(err) => log::warn!("failed to read report: {}", err),
            }
            return true;
        }

        log::trace!("response 0x{:02X}: {:02X?}", packet.kind, packet.data);
        match self.responses.try_send(packet) {
            Ok(()) => true,
            Err(TrySendError::Full(packet)) => {
                log::warn!("response queue full, discarding response 0x{:02X}", packet.kind);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfa635_protocol::{Key, KeyActivity, REPORT_FAN_SPEED, REPORT_KEY_ACTIVITY};

    fn router(depth: usize) -> (Router, Receiver<Report>, Receiver<Packet>) {
        let (reports_tx, reports_rx) = bounded(depth);
        let (responses_tx, responses_rx) = bounded(RESPONSE_QUEUE_DEPTH);
        (
            Router {
                reports: reports_tx,
                responses: responses_tx,
            },
            reports_rx,
            responses_rx,
        )
    }

    #[test]
    fn test_route_report_and_response() {
        let (router, reports, responses) = router(4);
        assert!(router.route(Packet::new(REPORT_KEY_ACTIVITY, &[2]).unwrap()));
        assert!(router.route(Packet::new(0x46, &[]).unwrap()));

        assert_eq!(
            reports.try_recv().unwrap(),
            Report::KeyActivity(KeyActivity {
                key: Key::Down,
                pressed: true
            })
        );
        assert_eq!(responses.try_recv().unwrap(), Packet::new(0x46, &[]).unwrap());
    }

    #[test]
    fn test_malformed_report_dropped() {
        let (router, reports, responses) = router(4);
        assert!(router.route(Packet::new(REPORT_FAN_SPEED, &[0, 0, 0, 0]).unwrap()));
        assert!(router.route(Packet::new(0x8F, &[]).unwrap()));
        assert!(reports.is_empty());
        assert!(responses.is_empty());
    }

    #[test]
    fn test_error_class_routed_as_response() {
        let (router, _reports, responses) = router(4);
        assert!(router.route(Packet::new(0xDF, &[]).unwrap()));
        assert_eq!(responses.try_recv().unwrap().kind, 0xDF);
    }

    #[test]
    fn test_full_report_queue_does_not_block_responses() {
        let (router, reports, responses) = router(1);
        for _ in 0..3 {
            assert!(router.route(Packet::new(REPORT_KEY_ACTIVITY, &[1]).unwrap()));
        }
        assert!(router.route(Packet::new(0x40, &[]).unwrap()));
        assert_eq!(reports.len(), 1);
        assert_eq!(responses.len(), 1);
    }

    #[test]
    fn test_route_stops_when_module_gone() {
        let (router, _reports, responses) = router(1);
        drop(responses);
        assert!(!router.route(Packet::new(0x40, &[]).unwrap()));
    }

    #[test]
    fn test_pipeline_exits_on_eof() {
        let source = io::Cursor::new(Packet::new(REPORT_KEY_ACTIVITY, &[7]).unwrap().encode());
        let (mut pipeline, queues) = Pipeline::spawn(
            source,
            PipelineConfig {
                packet_timeout: Duration::from_millis(250),
                report_queue_depth: 4,
            },
        )
        .unwrap();

        assert_eq!(
            queues.reports.recv_timeout(Duration::from_secs(1)).unwrap(),
            Report::KeyActivity(KeyActivity {
                key: Key::Up,
                pressed: false
            })
        );
        pipeline.join();
        assert!(pipeline.is_finished());
        assert!(queues.reports.recv().is_err());
        assert!(queues.responses.recv().is_err());
    }
}
