//! Rule content, one module per standard section.
//!
//! Each module exposes `register`, which adds its rules to a catalog.
//!
//! | Module | Section | RMR context |
//! |--------|---------|-------------|
//! | `section6` | 6 Lighting | `buildings` |
//! | `section15` | 15 Transformers | `transformers` |

pub mod section15;
pub mod section6;
