//! Static IPv4 stack over the EMAC
//!
//! smoltcp answers ARP and ICMP echo on its own; TCP services hook into the
//! poll loop in [`run`].

pub mod iperf;
pub mod upgrade;

use core::sync::atomic::{AtomicBool, Ordering};

use atstart_core::net::NetConfig;
use embassy_futures::select::select;
use embassy_time::{Duration, Instant, Timer};
use smoltcp::iface::{Config, Interface, SocketSet, SocketStorage};
use smoltcp::wire::{EthernetAddress, HardwareAddress, IpAddress, IpCidr, Ipv4Address};
use static_cell::ConstStaticCell;

use self::iperf::IperfServer;
use self::upgrade::UpgradeListener;
use crate::emac::{self, Emac};

const SOCKETS: usize = 2;

static SOCKET_STORAGE: ConstStaticCell<[SocketStorage<'static>; SOCKETS]> =
    ConstStaticCell::new([SocketStorage::EMPTY; SOCKETS]);

/// Last link state seen by the PHY poll
static LINK_UP: AtomicBool = AtomicBool::new(false);

pub fn link_up() -> bool {
    LINK_UP.load(Ordering::Relaxed)
}

fn timestamp() -> smoltcp::time::Instant {
    smoltcp::time::Instant::from_millis(Instant::now().as_millis() as i64)
}

/// Interface, socket set and the device they run on
pub struct NetStack {
    iface: Interface,
    sockets: SocketSet<'static>,
    device: Emac,
    link_poll: Duration,
}

impl NetStack {
    /// Static address and default route from `config`
    pub fn new(mut device: Emac, config: &NetConfig) -> Self {
        let mut iface_config =
            Config::new(HardwareAddress::Ethernet(EthernetAddress(config.mac)));
        let [.., m4, m5] = config.mac;
        iface_config.random_seed = (u64::from(u16::from_be_bytes([m4, m5])) << 32)
            | (Instant::now().as_ticks() & 0xFFFF_FFFF);

        let mut iface = Interface::new(iface_config, &mut device, timestamp());
        let [a, b, c, d] = config.ip;
        iface.update_ip_addrs(|addrs| {
            if addrs
                .push(IpCidr::new(IpAddress::v4(a, b, c, d), config.prefix_len))
                .is_err()
            {
                defmt::warn!("net: address table full");
            }
        });
        if iface
            .routes_mut()
            .add_default_ipv4_route(Ipv4Address::from(config.gateway))
            .is_err()
        {
            defmt::warn!("net: route table full");
        }

        LINK_UP.store(device.is_link_up(), Ordering::Relaxed);
        defmt::info!(
            "net: {}.{}.{}.{}/{} via {}.{}.{}.{}",
            a,
            b,
            c,
            d,
            config.prefix_len,
            config.gateway[0],
            config.gateway[1],
            config.gateway[2],
            config.gateway[3]
        );

        Self {
            iface,
            sockets: SocketSet::new(&mut SOCKET_STORAGE.take()[..]),
            device,
            link_poll: Duration::from_millis(config.link_poll_ms),
        }
    }

    pub fn sockets(&mut self) -> &mut SocketSet<'static> {
        &mut self.sockets
    }
}

/// TCP service polled after every interface poll
pub enum Service {
    Iperf(IperfServer),
    Upgrade(UpgradeListener),
}

impl Service {
    fn poll(&mut self, sockets: &mut SocketSet<'static>, now_ms: u64) {
        match self {
            Service::Iperf(server) => server.poll(sockets, now_ms),
            Service::Upgrade(listener) => listener.poll(sockets),
        }
    }
}

/// Poll the interface forever, waking on EMAC interrupts, socket timers and
/// the link poll interval.
#[embassy_executor::task]
pub async fn run(stack: NetStack, service: Service) -> ! {
    let (mut stack, mut service) = (stack, service);
    let mut next_link_poll = Instant::now();
    loop {
        let now = timestamp();
        stack.iface.poll(now, &mut stack.device, &mut stack.sockets);
        service.poll(&mut stack.sockets, Instant::now().as_millis());

        if Instant::now() >= next_link_poll {
            LINK_UP.store(stack.device.poll_link(), Ordering::Relaxed);
            next_link_poll += stack.link_poll;
        }

        let wake = match stack.iface.poll_delay(timestamp(), &stack.sockets) {
            Some(delay) => {
                (Instant::now() + Duration::from_micros(delay.total_micros())).min(next_link_poll)
            }
            None => next_link_poll,
        };
        select(emac::wait_event(), Timer::at(wake)).await;
    }
}
