// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging and panic reporting shared by the diskq binaries and tests.
//!
//! ```rust,no_run
//! use diskq_common_telemetry::{
//!     logging::{LogFormat, LoggingOptions, init_global_logging},
//!     panic_hook::set_panic_hook,
//! };
//!
//! let opts = LoggingOptions::builder()
//!     .dir("/var/log/diskq")
//!     .log_format(LogFormat::Json)
//!     .build();
//! let _guards = init_global_logging("diskq", &opts).unwrap();
//! set_panic_hook();
//! ```

pub mod logging;
pub mod panic_hook;
