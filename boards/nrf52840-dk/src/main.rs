#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use radio_sync_core::CallSerializer;
use rtic::app;

mod clock;
mod device_id;
mod fabric;
mod mpsl_arbiter;
mod radio;
mod timers;

/// `FICR.DEVICEID` of the board that transmits sync packets
const TX_DEVICE_ID: u64 = 0x5A3C_91E2_07D4_B816;

/// Interval between statistics reports
const HEARTBEAT_SECS: u64 = 5;

/// Start/stop requests from any task to `session_owner`
static CALLS: CallSerializer<CriticalSectionRawMutex> = CallSerializer::new();

#[app(device = embassy_nrf::pac, peripherals = false, dispatchers = [SWI1_EGU1, SWI2_EGU2])]
mod app {
    use super::*;
    use defmt::{info, warn};
    use embassy_nrf::bind_interrupts;
    use embassy_time::Timer;
    use nrf_mpsl::{raw as mpsl_raw, MultiprotocolServiceLayer, Peripherals as MpslPeripherals};
    use radio_sync_core::{Role, SessionOwner, SyncConfig, WindowPeripherals};
    use static_cell::StaticCell;

    use clock::Timer2Clock;
    use device_id::FicrDeviceId;
    use fabric::PpiRouter;
    use mpsl_arbiter::{BoardEngine, MpslArbiter};
    use radio::{NrfRadio, RADIO_BUFFER_LEN};
    use timers::WindowTimers;

    type Mpsl = MultiprotocolServiceLayer<'static>;

    // MPSL owns RTC0, TIMER0, RADIO and the clock interrupts
    bind_interrupts!(struct Irqs {
        SWI0_EGU0 => nrf_mpsl::LowPrioInterruptHandler;
        POWER_CLOCK => nrf_mpsl::ClockInterruptHandler;
        RADIO => nrf_mpsl::HighPrioInterruptHandler;
        TIMER0 => nrf_mpsl::HighPrioInterruptHandler;
        RTC0 => nrf_mpsl::HighPrioInterruptHandler;
    });

    #[shared]
    struct Shared {}

    #[local]
    struct Local {}

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("Radio sync firmware starting...");

        let p = embassy_nrf::init(Default::default());

        let lfclk_cfg = mpsl_raw::mpsl_clock_lfclk_cfg_t {
            source: mpsl_raw::MPSL_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy_ppm: mpsl_raw::MPSL_CLOCK_LF_ACCURACY_500_PPM as u16,
        };

        // On nrf52 MPSL needs RTC0, TIMER0, TEMP, PPI_CH19, PPI_CH30, PPI_CH31
        let mpsl_p = MpslPeripherals::new(
            p.RTC0,
            p.TIMER0,
            p.TEMP,
            p.PPI_CH19,
            p.PPI_CH30,
            p.PPI_CH31,
        );
        static MPSL: StaticCell<Mpsl> = StaticCell::new();
        let mpsl: &'static Mpsl = match MultiprotocolServiceLayer::new(mpsl_p, Irqs, lfclk_cfg) {
            Ok(mpsl) => MPSL.init(mpsl),
            Err(e) => defmt::panic!("MPSL init failed: {}", e),
        };
        if let Err(e) = mpsl_arbiter::init_sessions() {
            defmt::panic!("Timeslot session setup failed: {}", e);
        }
        info!("MPSL initialized with one timeslot session");

        let config = SyncConfig {
            tx_device_id: TX_DEVICE_ID,
            ..SyncConfig::default()
        };
        let role = Role::select(&FicrDeviceId, &config);

        static RADIO_BUFFER: StaticCell<[u8; RADIO_BUFFER_LEN]> = StaticCell::new();
        let hw = WindowPeripherals {
            clock: Timer2Clock::new(p.TIMER2),
            router: PpiRouter::new(p.PPI_CH0, p.PPI_CH1, p.PPI_CH2, p.PPI_GROUP0),
            radio: NrfRadio::new(p.RADIO, RADIO_BUFFER.init([0; RADIO_BUFFER_LEN])),
            timers: WindowTimers::new(p.TIMER3),
        };

        static ENGINE: StaticCell<BoardEngine> = StaticCell::new();
        let engine: &'static BoardEngine = ENGINE.init(BoardEngine::new(config, role, hw));
        engine.start_reference_clock();
        mpsl_arbiter::attach(engine);

        mpsl_task::spawn(mpsl).ok();
        session_owner::spawn(MpslArbiter::new(mpsl), engine).ok();
        schedule_control::spawn().ok();
        heartbeat::spawn(engine).ok();

        (Shared {}, Local {})
    }

    /// Services MPSL's low priority work
    #[task(priority = 1)]
    async fn mpsl_task(_cx: mpsl_task::Context, mpsl: &'static Mpsl) -> ! {
        mpsl.run().await
    }

    /// The only task that calls the timeslot session API
    #[task(priority = 2)]
    async fn session_owner(
        _cx: session_owner::Context,
        arbiter: MpslArbiter,
        engine: &'static BoardEngine,
    ) -> ! {
        info!("Session owner started");
        SessionOwner::new(arbiter, engine).run(&CALLS).await
    }

    /// Starts the synchronized schedule once at boot
    #[task(priority = 1)]
    async fn schedule_control(_cx: schedule_control::Context) {
        CALLS.start_synchronized_schedule().await;
        info!("Synchronized schedule requested");
    }

    /// Heartbeat task
    #[task(priority = 1)]
    async fn heartbeat(_cx: heartbeat::Context, engine: &'static BoardEngine) {
        info!("Heartbeat task started");
        let mut last_windows = 0;
        loop {
            Timer::after_secs(HEARTBEAT_SECS).await;
            let stats = engine.stats().snapshot();
            info!(
                "{} {}: {} correction={}",
                engine.role(),
                engine.state(),
                stats,
                engine.correction()
            );
            if stats.windows_started == last_windows {
                warn!("No timeslot granted in the last {}s", HEARTBEAT_SECS);
            }
            last_windows = stats.windows_started;
        }
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }
}
