#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

pub use vc_document as document;
pub use vc_migrate as migrate;
pub use vc_persist as persist;
pub use vc_utils as utils;
