//! # idlkit core
//!
//! Schema-driven Borsh coding, discriminators and program-derived
//! addresses for programs described by an Anchor-style IDL.
//!
//! ```no_run
//! use idlkit_core::prelude::*;
//!
//! let idl = Idl::from_path("target/idl/counter.json")?;
//! let coder = BorshCoder::new(&idl)?;
//! let data = coder.accounts().encode(
//!     "Counter",
//!     &IdlValue::structure([("count", IdlValue::U64(1))]),
//! )?;
//! let (name, value) = coder.accounts().decode_any(&data)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod codec;
pub mod coder;
pub mod discriminator;
pub mod error;
pub mod hex;
pub mod idl;
pub mod layout;
pub mod pda;
pub mod pubkey;
pub mod value;

pub mod prelude {
    pub use crate::cache::{CacheConfig, CacheStats, DiscriminatorCache, PdaCache};
    pub use crate::codec::BorshCodec;
    pub use crate::coder::{
        AccountsCoder, BorshCoder, CoderConfig, EventsCoder, InstructionsCoder, MemcmpFilter, TypesCoder,
    };
    pub use crate::discriminator::{Discriminator, Namespace, DISCRIMINATOR_LEN};
    pub use crate::error::{CodecError, CoderError, CoderResult, PdaError, SchemaError};
    pub use crate::idl::{EntryKind, Idl, IdlType};
    pub use crate::layout::{Layout, LayoutInfo, TypeRegistry};
    pub use crate::pda::{PdaResult, PdaSeed, SeedContext};
    pub use crate::pubkey::Pubkey;
    pub use crate::value::IdlValue;
}
