/*!
    Vendored vehicle-command wire schemas as hand-maintained `prost` types.

    Field numbers and enum values follow the upstream protobuf definitions
    (`universal_message.proto`, `signatures.proto`, `vcsec.proto`,
    `car_server.proto`, `keys.proto`), trimmed to the messages the client
    exercises. Unknown fields on the wire are skipped by prost, so the trim
    is decode-compatible with full peers.
*/

pub mod carserver;
pub mod keys;
pub mod signatures;
pub mod universal;
pub mod vcsec;

pub use prost;
