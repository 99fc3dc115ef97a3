use std::io;
use std::io::Write;

use xml::common::XmlVersion;
use xml::writer::EmitterConfig;
use xml::writer::EventWriter;
use xml::writer::XmlEvent;

use super::trip_sampler::Trip;


pub static MATRIX_ROOT_ELEMENT: &str = "scsimulator_matrix";
static TRIP_ELEMENT: &str = "trip";
const PROGRESS_INTERVAL: usize = 10000;

/// Streams trip records to a sink as a trip matrix document, one element per record.
/// Attribute values are escaped by the xml emitter.
pub struct TripWriter<W: Write> {
    writer: EventWriter<W>,
    num_written: usize,
}

impl<W: Write> TripWriter<W> {
    /// Writes the xml declaration and opens the root element.
    pub fn new(sink: W) -> io::Result<TripWriter<W>> {
        let writer = EmitterConfig::new().perform_indent(true).create_writer(sink);
        let mut trip_writer = TripWriter { writer, num_written: 0 };
        trip_writer.emit(XmlEvent::StartDocument {
            version: XmlVersion::Version10,
            encoding: Some("utf-8"),
            standalone: None,
        })?;
        trip_writer.emit(XmlEvent::start_element(MATRIX_ROOT_ELEMENT))?;
        Ok(trip_writer)
    }

    pub fn write_trip(&mut self, trip: &Trip) -> io::Result<()> {
        let count = trip.count.to_string();
        let start = trip.start_s.to_string();
        let digital_rails_capable = trip.digital_rails_capable.to_string();
        let element = XmlEvent::start_element(TRIP_ELEMENT)
            .attr("name", &trip.name)
            .attr("origin", trip.origin)
            .attr("destination", trip.destination)
            .attr("link_origin", trip.link_origin)
            .attr("count", &count)
            .attr("start", &start)
            .attr("mode", trip.mode)
            .attr("digital_rails_capable", &digital_rails_capable);
        self.emit(element)?;
        self.emit(XmlEvent::end_element())?;

        self.num_written += 1;
        if self.num_written % PROGRESS_INTERVAL == 0 {
            log::info!("... {} trips written ...", self.num_written);
        }
        Ok(())
    }

    pub fn write_all<'t, 'a: 't, I>(&mut self, trips: I) -> io::Result<()>
        where I: IntoIterator<Item = &'t Trip<'a>>
    {
        for trip in trips {
            self.write_trip(trip)?;
        }
        Ok(())
    }

    pub fn num_written(&self) -> usize {
        self.num_written
    }

    /// Closes the root element, flushes, and hands back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.emit(XmlEvent::end_element())?;
        let mut sink = self.writer.into_inner();
        sink.write_all(b"\n")?;
        sink.flush()?;
        Ok(sink)
    }

    fn emit<'e, E>(&mut self, event: E) -> io::Result<()>
        where E: Into<XmlEvent<'e>>
    {
        self.writer.write(event).map_err(|err| match err {
            xml::writer::Error::Io(err) => err,
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        })
    }
}
