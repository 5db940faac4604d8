// MplsSim: Simulating MPLS Traffic-Engineering Signaling
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Module for defining events

use crate::messages::{LdpMessage, RsvpMessage, TransportEvent};
use crate::types::RouterAddr;
use std::collections::VecDeque;

/// Event to handle. Every variant carries the emitting and the receiving
/// router address; delivery order is the enqueue order (FIFO).
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// RSVP-TE message from `#0` to `#1`.
    Rsvp(RouterAddr, RouterAddr, RsvpMessage),
    /// LDP message from `#0` to `#1`.
    Ldp(RouterAddr, RouterAddr, LdpMessage),
    /// LDP session transport event from `#0` to `#1`.
    LdpTransport(RouterAddr, RouterAddr, TransportEvent),
}

impl Event {
    /// The router this event is delivered to.
    pub fn target(&self) -> RouterAddr {
        match self {
            Event::Rsvp(_, to, _) => *to,
            Event::Ldp(_, to, _) => *to,
            Event::LdpTransport(_, to, _) => *to,
        }
    }

    /// Returns true if the event is an RSVP message
    pub fn is_rsvp_event(&self) -> bool {
        matches!(self, Event::Rsvp(_, _, _))
    }
}

/// Event queue for enqueuing events.
pub type EventQueue = VecDeque<Event>;
