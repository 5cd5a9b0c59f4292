// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

pub mod bit_vec;
pub mod options;
pub mod pta_statistics;
pub mod results_dumper;
pub mod worklist;
