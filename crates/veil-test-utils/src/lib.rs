// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock adapters and fixtures for Veil tests.

pub mod mock_transport;

pub use mock_transport::MockTransport;
