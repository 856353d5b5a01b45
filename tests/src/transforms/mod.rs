mod context;
mod control_flow;
mod grab;
mod pipeline;
mod scrambler;
mod shuffle;
