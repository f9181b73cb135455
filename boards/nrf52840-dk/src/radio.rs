//! RADIO in raw packet mode
//!
//! Packet layout in RAM: one LENGTH byte followed by the payload, no S0/S1
//! fields. Address is logical address 0 (`BASE0`/`PREFIX0.AP0`), CRC is
//! three bytes over the PDU only. Ramp-up is the 40 µs fast mode.
//!
//! Coded PHY packets end on PHYEND, after the TERM2 field, so the long
//! range modes use PHYEND wherever the others use END.

use core::sync::atomic::{compiler_fence, Ordering};

use embassy_nrf::pac;
use embassy_nrf::{peripherals, Peri};
use hal_abstractions::{RadioInterrupts, RadioMode, RadioPeripheral, RadioSettings};

/// LENGTH byte plus the largest payload
pub const RADIO_BUFFER_LEN: usize = 1 + u8::MAX as usize;

const DISABLE_SPIN_LIMIT: u32 = 1_000;

// SHORTS
const READY_START: u32 = 1 << 0;
const END_DISABLE: u32 = 1 << 1;
const ADDRESS_RSSISTART: u32 = 1 << 4;
const END_START: u32 = 1 << 5;
const PHYEND_DISABLE: u32 = 1 << 20;
const PHYEND_START: u32 = 1 << 21;

// INTENSET / INTENCLR
const INT_ADDRESS: u32 = 1 << 1;
const INT_END: u32 = 1 << 3;
const INT_CRCOK: u32 = 1 << 12;
const INT_PHYEND: u32 = 1 << 27;

// MODECNF0: RU = Fast, DTX = Center
const MODECNF0_FAST_CENTER: u32 = 1 | (2 << 8);

// STATE
const STATE_DISABLED: u32 = 0;

const CRC_POLY: u32 = 0x0000_065B;
const CRC_INIT: u32 = 0x0055_5555;

fn mode_bits(mode: RadioMode) -> u32 {
    match mode {
        RadioMode::Nrf1Mbit => 0,
        RadioMode::Nrf2Mbit => 1,
        RadioMode::Ble1Mbit => 3,
        RadioMode::Ble2Mbit => 4,
        RadioMode::BleLr125Kbit => 5,
        RadioMode::BleLr500Kbit => 6,
    }
}

fn pcnf0_bits(mode: RadioMode) -> u32 {
    const LFLEN_8: u32 = 8;
    let plen = match mode {
        RadioMode::Ble2Mbit => 1 << 24,
        RadioMode::BleLr125Kbit | RadioMode::BleLr500Kbit => 3 << 24,
        _ => 0,
    };
    let coded = if mode.is_long_range() {
        // CILEN = 2, TERMLEN = 3
        (2 << 22) | (3 << 29)
    } else {
        0
    };
    LFLEN_8 | plen | coded
}

fn interrupt_bits(sources: RadioInterrupts, long_range: bool) -> u32 {
    let mut bits = 0;
    if sources.contains(RadioInterrupts::END) {
        bits |= if long_range { INT_PHYEND } else { INT_END };
    }
    if sources.contains(RadioInterrupts::CRC_OK) {
        bits |= INT_CRCOK;
    }
    if sources.contains(RadioInterrupts::ADDRESS) {
        bits |= INT_ADDRESS;
    }
    bits
}

pub struct NrfRadio {
    _radio: Peri<'static, peripherals::RADIO>,
    buffer: &'static mut [u8; RADIO_BUFFER_LEN],
    max_payload: u8,
    long_range: bool,
}

impl NrfRadio {
    pub fn new(
        radio: Peri<'static, peripherals::RADIO>,
        buffer: &'static mut [u8; RADIO_BUFFER_LEN],
    ) -> Self {
        Self {
            _radio: radio,
            buffer,
            max_payload: 0,
            long_range: false,
        }
    }

    fn clear_end_events() {
        let r = pac::RADIO;
        r.events_ready().write_value(0);
        r.events_end().write_value(0);
        r.events_phyend().write_value(0);
        r.events_disabled().write_value(0);
    }

    /// Shorts ending the packet with `to_disable` or `to_start`
    fn packet_end(&self, to_disable: bool) -> u32 {
        match (self.long_range, to_disable) {
            (false, true) => END_DISABLE,
            (false, false) => END_START,
            (true, true) => PHYEND_DISABLE,
            (true, false) => PHYEND_START,
        }
    }
}

impl RadioPeripheral for NrfRadio {
    fn configure(&mut self, settings: &RadioSettings) {
        let r = pac::RADIO;
        self.max_payload = settings.max_payload;
        self.long_range = settings.mode.is_long_range();

        r.mode().write(|w| w.0 = mode_bits(settings.mode));
        r.modecnf0().write(|w| w.0 = MODECNF0_FAST_CENTER);
        r.frequency().write(|w| w.0 = settings.channel as u32);
        // TXPOWER takes the two's complement dBm value
        r.txpower().write(|w| w.0 = settings.tx_power_dbm as u8 as u32);

        r.pcnf0().write(|w| w.0 = pcnf0_bits(settings.mode));
        // MAXLEN, STATLEN = 0, BALEN = 3, little endian, no whitening
        r.pcnf1()
            .write(|w| w.0 = settings.max_payload as u32 | (3 << 16));

        r.base0().write_value(settings.base_address);
        r.prefix0().write(|w| w.0 = settings.prefix as u32);
        r.txaddress().write(|w| w.0 = 0);
        r.rxaddresses().write(|w| w.0 = 1);

        // LEN = 3, SKIPADDR
        r.crccnf().write(|w| w.0 = 3 | (1 << 8));
        r.crcpoly().write(|w| w.0 = CRC_POLY);
        r.crcinit().write(|w| w.0 = CRC_INIT);

        r.packetptr().write_value(self.buffer.as_ptr() as u32);
    }

    fn load_payload(&mut self, payload: &[u8]) {
        let len = payload.len().min(self.max_payload as usize);
        self.buffer[0] = len as u8;
        self.buffer[1..=len].copy_from_slice(&payload[..len]);
        // EasyDMA reads the buffer on START
        compiler_fence(Ordering::SeqCst);
    }

    fn ramp_up_tx(&mut self) {
        let r = pac::RADIO;
        Self::clear_end_events();
        // START comes from the chain timer, not READY
        r.shorts().write(|w| w.0 = self.packet_end(true));
        compiler_fence(Ordering::SeqCst);
        r.tasks_txen().write_value(1);
    }

    fn start_rx(&mut self, continuous: bool) {
        let r = pac::RADIO;
        Self::clear_end_events();
        r.events_crcok().write_value(0);
        let mut shorts = READY_START | ADDRESS_RSSISTART;
        if continuous {
            shorts |= self.packet_end(false);
        }
        r.shorts().write(|w| w.0 = shorts);
        compiler_fence(Ordering::SeqCst);
        r.tasks_rxen().write_value(1);
    }

    fn take_received(&mut self, buf: &mut [u8]) -> Option<usize> {
        let r = pac::RADIO;
        if r.events_crcok().read() == 0 {
            return None;
        }
        r.events_crcok().write_value(0);
        compiler_fence(Ordering::SeqCst);

        let len = (self.buffer[0] as usize)
            .min(self.max_payload as usize)
            .min(buf.len());
        buf[..len].copy_from_slice(&self.buffer[1..=len]);
        Some(len)
    }

    fn enable_interrupts(&mut self, sources: RadioInterrupts) {
        pac::RADIO
            .intenset()
            .write(|w| w.0 = interrupt_bits(sources, self.long_range));
    }

    fn disable_interrupts(&mut self) {
        pac::RADIO.intenclr().write(|w| w.0 = u32::MAX);
    }

    fn clear_events(&mut self) {
        let r = pac::RADIO;
        Self::clear_end_events();
        r.events_address().write_value(0);
        r.events_crcok().write_value(0);
        r.events_crcerror().write_value(0);
    }

    fn disable(&mut self) {
        let r = pac::RADIO;
        r.shorts().write(|w| w.0 = 0);
        if r.state().read().0 == STATE_DISABLED {
            return;
        }
        r.events_disabled().write_value(0);
        r.tasks_disable().write_value(1);
        for _ in 0..DISABLE_SPIN_LIMIT {
            if r.events_disabled().read() != 0 {
                break;
            }
            core::hint::spin_loop();
        }
        r.events_disabled().write_value(0);
    }
}
