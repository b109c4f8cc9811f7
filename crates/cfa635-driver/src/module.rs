//! Command/response correlation and the typed command set.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use cfa635_protocol::{
    diff_and_apply, response_code, DisplayState, DisplayWriter, Packet, PacketClass, Report,
    Sprite, CMD_CLEAR, CMD_PING, CMD_SET_BACKLIGHT, CMD_SET_GPIO, CMD_SET_SPRITE, CMD_WRITE,
    COLUMNS, LED_COUNT, MAX_DATA_LEN, MAX_LEVEL, MAX_PING_LEN, ROWS, SPRITE_ROW_MASK,
    SPRITE_SLOTS,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;

use crate::config::ConnectionConfig;
use crate::error::{LcdError, LcdResult};
use crate::pipeline::{Pipeline, PipelineConfig};

type Transport = Box<dyn Write + Send>;

/// Write side of the connection, guarded by the command lock.
struct Link {
    transport: Option<Transport>,
    /// Set when a command timed out and its response may still arrive.
    resync: bool,
}

/// A connected CFA635 module.
///
/// Commands are strictly serialized: the write half of the transport sits
/// behind a lock that is held from the moment a request is written until its
/// response arrives or times out. The protocol carries no request IDs, so
/// this single-flight rule is what pairs each response with its request.
///
/// Reports are read independently with [`read_report`](Self::read_report)
/// and never contend with commands.
///
/// # Late responses
///
/// After a command times out, the next command first resynchronizes: it
/// waits one full response timeout, discarding (and logging) anything that
/// arrives, before writing its own request. A late answer to the timed-out
/// command is therefore never taken as the answer to the next one, unless
/// the module is later than twice the response timeout. Repeated timeouts
/// usually mean the link is gone; callers should drop the connection rather
/// than keep issuing commands.
pub struct Module {
    link: Mutex<Link>,
    responses: Receiver<Packet>,
    reports: Receiver<Report>,
    response_timeout: Duration,
    pipeline: Pipeline,
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("response_timeout", &self.response_timeout)
            .field("pending_reports", &self.reports.len())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Module {
    /// Adopt the two halves of a transport with default timing.
    pub fn connect<R, W>(reader: R, writer: W) -> LcdResult<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self::connect_with_config(reader, writer, &ConnectionConfig::default())
    }

    /// Adopt the two halves of a transport, starting the read pipeline.
    pub fn connect_with_config<R, W>(reader: R, writer: W, config: &ConnectionConfig) -> LcdResult<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        config.validate()?;
        let (pipeline, queues) = Pipeline::spawn(
            reader,
            PipelineConfig {
                packet_timeout: config.packet_timeout(),
                report_queue_depth: config.report_queue_depth,
            },
        )?;

        Ok(Module {
            link: Mutex::new(Link {
                transport: Some(Box::new(writer)),
                resync: false,
            }),
            responses: queues.responses,
            reports: queues.reports,
            response_timeout: config.response_timeout(),
            pipeline,
        })
    }

    /// Close the connection.
    ///
    /// Flushes and drops the write half, then waits for the read pipeline to
    /// stop. The reader exits at end of file or, for transports with a read
    /// timeout such as serial ports, at its next timeout.
    pub fn close(mut self) -> LcdResult<()> {
        let flushed = match self.link.lock().transport.take() {
            Some(mut w) => w.flush(),
            None => Ok(()),
        };
        self.pipeline.shutdown();
        self.pipeline.join();
        flushed.map_err(LcdError::from)
    }

    /// Whether the read pipeline is still running.
    pub fn is_connected(&self) -> bool {
        !self.pipeline.is_finished()
    }

    // ------------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------------

    /// Block until the module sends a report.
    ///
    /// Returns `None` once the connection is gone and every buffered report
    /// has been read.
    pub fn read_report(&self) -> Option<Report> {
        self.reports.recv().ok()
    }

    /// Return a buffered report without blocking.
    pub fn try_read_report(&self) -> Option<Report> {
        self.reports.try_recv().ok()
    }

    /// Wait up to `timeout` for a report.
    pub fn read_report_timeout(&self, timeout: Duration) -> LcdResult<Report> {
        self.reports.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => LcdError::Timeout,
            RecvTimeoutError::Disconnected => LcdError::Disconnected,
        })
    }

    /// A handle on the report queue, for use with `crossbeam_channel::select!`.
    pub fn reports(&self) -> Receiver<Report> {
        self.reports.clone()
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Send an arbitrary command and return the module's response packet.
    ///
    /// Holds the command lock for the whole round trip. No check is made on
    /// the response; see [`simple`](Self::simple) for that.
    pub fn raw_command(&self, code: u8, payload: &[u8]) -> LcdResult<Packet> {
        let request = Packet::new(code, payload).ok_or(LcdError::PayloadTooLarge {
            max: MAX_DATA_LEN,
            actual: payload.len(),
        })?;
        let wire = request.encode();

        let mut link = self.link.lock();
        let Link { transport, resync } = &mut *link;
        let writer = transport.as_mut().ok_or(LcdError::Disconnected)?;

        if *resync {
            self.resynchronize()?;
            *resync = false;
        }
        self.discard_stale_responses()?;

        log::trace!("command 0x{:02X}: {:02X?}", code, payload);
        writer.write_all(&wire)?;
        writer.flush()?;

        match self.responses.recv_timeout(self.response_timeout) {
            Ok(response) => Ok(response),
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("command 0x{:02X} timed out after {:?}", code, self.response_timeout);
                *resync = true;
                Err(LcdError::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(LcdError::Disconnected),
        }
    }

    /// Send a command and require the success response code and exactly
    /// `expected` as its payload.
    pub fn simple(&self, code: u8, payload: &[u8], expected: &[u8]) -> LcdResult<()> {
        let response = self.raw_command(code, payload)?;
        if response.class() != PacketClass::Response
            || response.kind != response_code(code)
            || response.data != expected
        {
            log::debug!(
                "command 0x{:02X} got response 0x{:02X} {:02X?}",
                code,
                response.kind,
                response.data
            );
            return Err(LcdError::Failed { code });
        }
        Ok(())
    }

    /// Wait one response timeout for a late answer to a timed-out command,
    /// discarding everything that arrives meanwhile.
    fn resynchronize(&self) -> LcdResult<()> {
        let deadline = Instant::now() + self.response_timeout;
        loop {
            match self.responses.recv_deadline(deadline) {
                Ok(late) => log::warn!(
                    "discarding late response 0x{:02X} {:02X?}",
                    late.kind,
                    late.data
                ),
                Err(RecvTimeoutError::Timeout) => return Ok(()),
                Err(RecvTimeoutError::Disconnected) => return Err(LcdError::Disconnected),
            }
        }
    }

    /// Drop responses that arrived with no command waiting for them.
    fn discard_stale_responses(&self) -> LcdResult<()> {
        loop {
            match self.responses.try_recv() {
                Ok(stale) => log::warn!(
                    "discarding unsolicited response 0x{:02X} {:02X?}",
                    stale.kind,
                    stale.data
                ),
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => return Err(LcdError::Disconnected),
            }
        }
    }

    /// Ping the module; it must echo `payload` (at most 16 bytes).
    pub fn ping(&self, payload: &[u8]) -> LcdResult<()> {
        if payload.len() > MAX_PING_LEN {
            return Err(LcdError::PayloadTooLarge {
                max: MAX_PING_LEN,
                actual: payload.len(),
            });
        }
        self.simple(CMD_PING, payload, payload)
    }

    /// Clear the LCD. Afterwards every cell holds a space, matching
    /// [`DisplayState::cleared`].
    pub fn clear(&self) -> LcdResult<()> {
        self.simple(CMD_CLEAR, &[], &[])
    }

    /// Load a sprite into slot `index` (0..=7) of character generator RAM.
    ///
    /// Each row of `sprite` uses its low six bits, leftmost pixel in bit 5;
    /// the upper two bits must be zero. The sprite appears wherever codepoint
    /// `index` is written.
    pub fn set_sprite(&self, index: usize, sprite: &Sprite) -> LcdResult<()> {
        if index >= SPRITE_SLOTS {
            return Err(LcdError::SpriteIndex(index));
        }
        if let Some((row, &value)) = sprite.iter().enumerate().find(|&(_, &b)| b & !SPRITE_ROW_MASK != 0) {
            return Err(LcdError::InvalidSprite { row, value });
        }

        let mut payload = Vec::with_capacity(1 + sprite.len());
        payload.push(index as u8);
        payload.extend_from_slice(sprite);
        self.simple(CMD_SET_SPRITE, &payload, &[])
    }

    /// Set LCD and keypad backlight brightness, each 0 (off) to 100.
    pub fn set_backlight(&self, lcd: u8, keypad: u8) -> LcdResult<()> {
        if lcd > MAX_LEVEL || keypad > MAX_LEVEL {
            return Err(LcdError::Backlight { lcd, keypad });
        }
        self.simple(CMD_SET_BACKLIGHT, &[lcd, keypad], &[])
    }

    /// Write device codepoints at `col`, `row`.
    ///
    /// Data running past the end of the row is truncated; nothing wraps to
    /// the next row. Use [`cfa635_protocol::transliterate`] to produce
    /// codepoints from text.
    pub fn write(&self, col: usize, row: usize, data: &[u8]) -> LcdResult<()> {
        if col >= COLUMNS || row >= ROWS {
            return Err(LcdError::Position { col, row });
        }
        let data = &data[..data.len().min(COLUMNS - col)];

        let mut payload = Vec::with_capacity(2 + data.len());
        payload.push(col as u8);
        payload.push(row as u8);
        payload.extend_from_slice(data);
        self.simple(CMD_WRITE, &payload, &[])
    }

    /// Write device codepoints, continuing at column 0 of following rows.
    ///
    /// Anything that does not fit before the bottom-right corner is dropped.
    pub fn write_wrapped(&self, mut col: usize, mut row: usize, mut data: &[u8]) -> LcdResult<()> {
        if col >= COLUMNS || row >= ROWS {
            return Err(LcdError::Position { col, row });
        }
        while row < ROWS && !data.is_empty() {
            let n = data.len().min(COLUMNS - col);
            self.write(col, row, &data[..n])?;
            data = &data[n..];
            col = 0;
            row += 1;
        }
        Ok(())
    }

    /// Set one color of LED `index` (0..=3, top to bottom) to a duty cycle
    /// from 0 (off) to 100.
    pub fn set_led(&self, index: usize, green: bool, duty: u8) -> LcdResult<()> {
        if index >= LED_COUNT {
            return Err(LcdError::LedIndex(index));
        }
        if duty > MAX_LEVEL {
            return Err(LcdError::LedDuty(duty));
        }

        // LEDs are GPIO pairs counting down from 12: red on the even
        // channel, green on the odd one below it.
        let mut channel = 11 - 2 * index as u8;
        if !green {
            channel += 1;
        }
        self.simple(CMD_SET_GPIO, &[channel, duty], &[])
    }

    /// Send the writes that move the LCD from `old` to `new`.
    ///
    /// `old` must be what the module currently shows; the driver keeps no
    /// copy of its own.
    pub fn update(&self, old: &DisplayState, new: &DisplayState) -> LcdResult<()> {
        let mut writer = self;
        diff_and_apply(old, new, &mut writer)
    }
}

impl DisplayWriter for &Module {
    type Error = LcdError;

    fn write(&mut self, col: usize, row: usize, data: &[u8]) -> LcdResult<()> {
        Module::write(self, col, row, data)
    }
}

impl DisplayWriter for Module {
    type Error = LcdError;

    fn write(&mut self, col: usize, row: usize, data: &[u8]) -> LcdResult<()> {
        Module::write(self, col, row, data)
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        self.link.lock().transport.take();
        self.pipeline.shutdown();
    }
}
