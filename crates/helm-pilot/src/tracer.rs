use std::collections::VecDeque;

use helm_proto::Point;
use tokio::sync::oneshot;

use crate::actor::Actor;
use crate::fault::Fault;

#[derive(Debug)]
pub enum TracerMessage {
    Add(Point),
    Points(oneshot::Sender<Vec<Point>>),
}

/// Keeps the last `max_points` positions.
pub struct Tracer {
    max_points: usize,
    points: VecDeque<Point>,
}

impl Tracer {
    pub fn new(max_points: usize) -> Self {
        Self { max_points, points: VecDeque::with_capacity(max_points) }
    }

    fn add(&mut self, point: Point) {
        if self.max_points == 0 {
            return;
        }
        if self.points.len() == self.max_points {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }
}

impl Actor for Tracer {
    type Message = TracerMessage;
    const NAME: &'static str = "tracer";

    async fn handle(&mut self, msg: TracerMessage) -> Result<(), Fault> {
        match msg {
            TracerMessage::Add(point) => self.add(point),
            TracerMessage::Points(reply) => {
                // oldest first
                let _ = reply.send(self.points.iter().cloned().collect());
            }
        }
        Ok(())
    }
}
