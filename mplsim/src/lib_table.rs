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

//! # Label Information Base
//!
//! Per-router table mapping (incoming interface, incoming label) to a label
//! operation sequence and an outgoing interface. Only control-plane label
//! installation is modeled here; the per-packet switching fast path is not.

use crate::types::{DeviceError, InterfaceAddr, Label};
use log::*;

/// A single label operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOp {
    /// Add a label on top of the stack (ingress)
    Push(Label),
    /// Replace the top label (transit)
    Swap(Label),
    /// Remove the top label and forward natively (egress)
    Pop,
}

/// Label operation sequence of one LIB entry.
pub type LabelOpVec = Vec<LabelOp>;

/// Operation vector for an ingress entry.
pub fn push_label(label: Label) -> LabelOpVec {
    vec![LabelOp::Push(label)]
}

/// Operation vector for a transit entry.
pub fn swap_label(label: Label) -> LabelOpVec {
    vec![LabelOp::Swap(label)]
}

/// Operation vector for an egress entry.
pub fn pop_label() -> LabelOpVec {
    vec![LabelOp::Pop]
}

/// Opaque FEC tag stored with each entry (LSP id for RSVP-signaled entries,
/// destination address for LDP-signaled ones). Used for ingress
/// classification and tracing only.
pub type FecId = u32;

/// One LIB entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LibEntry {
    /// Incoming label
    pub in_label: Label,
    /// Incoming interface; `None` for ingress entries, which are looked up
    /// by FEC rather than by incoming label.
    pub in_interface: Option<InterfaceAddr>,
    /// Label operation sequence to apply
    pub ops: LabelOpVec,
    /// Outgoing interface; `None` means deliver natively (egress).
    pub out_interface: Option<InterfaceAddr>,
    /// FEC tag
    pub fec: FecId,
    /// Color tag for tracing
    pub color: u32,
}

/// The label table of one router.
#[derive(Debug, Clone, Default)]
pub struct LibTable {
    entries: Vec<LibEntry>,
    next_label: Label,
}

impl LibTable {
    /// New, empty table. The label space starts at 1.
    pub fn new() -> Self {
        Self { entries: Vec::new(), next_label: 1 }
    }

    /// Install an entry. With `in_label == None` a fresh label is allocated
    /// from the router-local label space and a new entry is created;
    /// otherwise the entry with the given incoming label is updated in
    /// place (or created if absent). Returns the incoming label of the
    /// entry.
    pub fn install(
        &mut self,
        in_label: Option<Label>,
        in_interface: Option<InterfaceAddr>,
        ops: LabelOpVec,
        out_interface: Option<InterfaceAddr>,
        fec: FecId,
    ) -> Label {
        let label = match in_label {
            Some(label) => label,
            None => {
                let label = self.next_label;
                self.next_label += 1;
                label
            }
        };
        match self.entries.iter_mut().find(|e| e.in_label == label) {
            Some(entry) => {
                entry.in_interface = in_interface;
                entry.ops = ops;
                entry.out_interface = out_interface;
                entry.fec = fec;
            }
            None => {
                debug!(
                    "install LIB entry: in_label={}, in_if={:?}, ops={:?}, out_if={:?}, fec={}",
                    label, in_interface, ops, out_interface, fec
                );
                self.entries.push(LibEntry {
                    in_label: label,
                    in_interface,
                    ops,
                    out_interface,
                    fec,
                    color: 0,
                });
            }
        }
        label
    }

    /// Forwarding-direction lookup: resolve (incoming interface, incoming
    /// label) to the operation sequence and outgoing interface.
    pub fn resolve(
        &self,
        in_interface: InterfaceAddr,
        in_label: Label,
    ) -> Option<(&LabelOpVec, Option<InterfaceAddr>)> {
        self.entries
            .iter()
            .find(|e| e.in_interface == Some(in_interface) && e.in_label == in_label)
            .map(|e| (&e.ops, e.out_interface))
    }

    /// Signaling-direction lookup: classify a FEC at the ingress. Returns
    /// the operation sequence and the outgoing interface of the matching
    /// ingress entry.
    pub fn resolve_fec(&self, fec: FecId) -> Option<(&LabelOpVec, Option<InterfaceAddr>)> {
        self.entries
            .iter()
            .find(|e| e.fec == fec && e.in_interface.is_none())
            .map(|e| (&e.ops, e.out_interface))
    }

    /// Remove the entry with the given incoming label. A missing label is a
    /// logic error, not a recoverable condition.
    pub fn remove(&mut self, in_label: Label) -> Result<(), DeviceError> {
        match self.entries.iter().position(|e| e.in_label == in_label) {
            Some(pos) => {
                self.entries.remove(pos);
                Ok(())
            }
            None => Err(DeviceError::LabelNotFound(in_label)),
        }
    }

    /// All live entries, in installation order.
    pub fn entries(&self) -> &[LibEntry] {
        &self.entries
    }
}
