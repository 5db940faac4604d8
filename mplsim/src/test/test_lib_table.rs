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

//! Test the label information base.

use crate::lib_table::{pop_label, push_label, swap_label, LabelOp, LibTable};
use crate::types::{DeviceError, InterfaceAddr};
use std::collections::HashSet;

#[test]
fn label_allocation_is_unique() {
    let mut lib = LibTable::new();
    let mut labels = HashSet::new();
    for fec in 0..10 {
        let label = lib.install(None, Some(InterfaceAddr(1)), swap_label(9), Some(InterfaceAddr(2)), fec);
        // the router-local label space never hands out a label twice
        assert!(labels.insert(label));
    }
    assert_eq!(lib.entries().len(), 10);
    let mut seen = HashSet::new();
    assert!(lib.entries().iter().all(|e| seen.insert(e.in_label)));
}

#[test]
fn install_with_label_updates_in_place() {
    let mut lib = LibTable::new();
    let label = lib.install(None, Some(InterfaceAddr(1)), swap_label(9), Some(InterfaceAddr(2)), 7);
    // re-installing under the same incoming label must not create a second
    // entry, only rewrite the operation
    let same = lib.install(Some(label), Some(InterfaceAddr(1)), swap_label(13), Some(InterfaceAddr(3)), 7);
    assert_eq!(same, label);
    assert_eq!(lib.entries().len(), 1);
    let (ops, out) = lib.resolve(InterfaceAddr(1), label).unwrap();
    assert_eq!(ops, &swap_label(13));
    assert_eq!(out, Some(InterfaceAddr(3)));
}

#[test]
fn resolve_directions() {
    let mut lib = LibTable::new();
    // ingress entry, classified by FEC
    lib.install(None, None, push_label(4), Some(InterfaceAddr(2)), 1);
    // egress entry, classified by (interface, label)
    let pop = lib.install(None, Some(InterfaceAddr(1)), pop_label(), None, 2);

    let (ops, out) = lib.resolve_fec(1).unwrap();
    assert_eq!(ops, &vec![LabelOp::Push(4)]);
    assert_eq!(out, Some(InterfaceAddr(2)));

    let (ops, out) = lib.resolve(InterfaceAddr(1), pop).unwrap();
    assert_eq!(ops, &vec![LabelOp::Pop]);
    assert_eq!(out, None);

    // the ingress entry is invisible to the forwarding direction
    assert!(lib.resolve(InterfaceAddr(2), 1).is_none());
    assert!(lib.resolve_fec(2).is_none());
}

#[test]
fn remove_missing_label_is_fatal() {
    let mut lib = LibTable::new();
    let label = lib.install(None, Some(InterfaceAddr(1)), pop_label(), None, 1);
    assert_eq!(lib.remove(label), Ok(()));
    assert_eq!(lib.remove(label), Err(DeviceError::LabelNotFound(label)));
}
