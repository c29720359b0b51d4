//! Strata - streaming image display firmware
//!
//! Main firmware binary for RP2040 boards driving an SPI panel. Images
//! arrive from a network bridge over UART, are buffered on the heap and
//! decoded strip by strip straight onto the display.

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embedded_alloc::LlffHeap as Heap;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use strata_core::upload::UploadManager;

use crate::boards::Board;
use crate::channels::SHARED_UPLOAD;
use crate::system::{HeapStats, UptimeClock};

mod boards;
mod channels;
mod config;
mod display;
mod system;
mod tasks;

// Heap allocator for upload buffers and decoder workspaces
#[global_allocator]
pub(crate) static HEAP: Heap = Heap::empty();

// Heap size: 160KB
const HEAP_SIZE: usize = 160 * 1024;

/// Upload link speed; one full frame takes about 3 ms
const LINK_BAUD: u32 = 921_600;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Strata firmware starting...");

    // Initialize heap allocator
    init_heap();

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load_board_config();
    let board = Board::take(p);

    // Setup UART for the upload link
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = LINK_BAUD;

    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 1024]);

    let link = board.link;
    let uart = Uart::new_blocking(link.uart, link.tx, link.rx, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART initialized at {} baud", LINK_BAUD);

    let display = display::build_display(board.display, &config);

    let manager = UploadManager::new(
        &SHARED_UPLOAD,
        config.upload,
        config.display.visible_size(),
        HeapStats,
        UptimeClock,
    );
    info!("Heap: {} bytes free", HEAP.free());

    spawner.spawn(unwrap!(tasks::render_task(display, config)));
    spawner.spawn(unwrap!(tasks::upload_rx_task(rx, manager)));
    spawner.spawn(unwrap!(tasks::upload_tx_task(tx)));

    info!("All tasks spawned, firmware running");

    // Main task has nothing else to do - all work happens in spawned tasks
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat, heap free {}", HEAP.free());
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
