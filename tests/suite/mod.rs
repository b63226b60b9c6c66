mod admission;
mod handoff;
mod mutation;
